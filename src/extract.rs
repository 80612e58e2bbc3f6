use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    error::AniKaiError,
    fallback::{try_in_order, Attempt},
    model::SourceKind,
};

/// A named matcher whose first capture group is the stream url.
pub struct ExtractionPattern {
    pub name: &'static str,
    regex: Regex,
}

impl ExtractionPattern {
    fn new(name: &'static str, pattern: &str) -> Self {
        ExtractionPattern {
            name,
            regex: Regex::new(pattern).unwrap(),
        }
    }

    pub fn find(&self, payload: &str) -> Option<String> {
        self.regex
            .captures(payload)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().replace("\\/", "/"))
    }
}

lazy_static! {
    /// Tried in order, strictest first.
    pub static ref EXTRACTION_PATTERNS: Vec<ExtractionPattern> = vec![
        ExtractionPattern::new(
            "sources-file",
            r#""sources"\s*:\s*\[\s*\{\s*"file"\s*:\s*"([^"]+)""#,
        ),
        ExtractionPattern::new("sources-string", r#""sources"\s*:\s*\[\s*"([^"]+)""#),
        ExtractionPattern::new("bare-file", r#""file"\s*:\s*"([^"]+)""#),
        ExtractionPattern::new("loose-m3u8", r#"(https?:[^"\\]+\.m3u8[^"\\]*)"#),
    ];
}

/// Recovers the stream url from a decoded media payload.
pub async fn extract_stream_url(payload: &str) -> Option<String> {
    let attempts = EXTRACTION_PATTERNS
        .iter()
        .map(|pattern| {
            Attempt::new(pattern.name, move || async move {
                Ok::<_, AniKaiError>(pattern.find(payload))
            })
        })
        .collect();

    try_in_order(attempts).await
}

pub fn infer_kind(url: &str) -> SourceKind {
    let lower = url.to_lowercase();
    if lower.contains(".m3u8") || lower.contains("playlist") {
        SourceKind::Hls
    } else if lower.contains(".mpd") {
        SourceKind::Dash
    } else {
        SourceKind::Progressive
    }
}
