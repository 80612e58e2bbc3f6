use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::settings::DisplayMode;

/// Candidate base url of one AnimeKai mirror, without trailing slash.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MirrorHost(String);

impl MirrorHost {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        MirrorHost(url.trim().trim_end_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Joins a site path (or passes an absolute url through).
    pub fn join(&self, path: &str) -> String {
        Url::parse(&format!("{}/", self.0))
            .and_then(|base| base.join(path))
            .map(|joined| joined.to_string())
            .unwrap_or_else(|_| format!("{}/{}", self.0, path.trim_start_matches('/')))
    }
}

impl fmt::Display for MirrorHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MirrorHost {
    fn from(s: &str) -> Self {
        MirrorHost::new(s)
    }
}

/// Value produced by an operation that degrades instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation succeeded as intended.
    Genuine(T),
    /// Best-effort stand-in produced after local recovery.
    Degraded(T),
}

impl<T> Outcome<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(_))
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Genuine(v) | Outcome::Degraded(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Outcome::Genuine(v) | Outcome::Degraded(v) => v,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageType {
    Sub,
    Softsub,
    Dub,
    Unknown,
}

impl LanguageType {
    /// Maps a group label like `"softsub"`; unrecognised labels are `Unknown`.
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "sub" => LanguageType::Sub,
            "softsub" => LanguageType::Softsub,
            "dub" => LanguageType::Dub,
            _ => LanguageType::Unknown,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LanguageType::Sub => "sub",
            LanguageType::Softsub => "softsub",
            LanguageType::Dub => "dub",
            LanguageType::Unknown => "unknown",
        }
    }
}

impl FromStr for LanguageType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(LanguageType::from_label(s))
    }
}

impl fmt::Display for LanguageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One delivery server offered for an episode.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeliveryServer {
    pub server_id: String,
    pub display_name: String,
    pub language_type: LanguageType,
    pub slot_index: u32,
    pub quality: u32,
}

impl DeliveryServer {
    pub fn label(&self) -> String {
        format!("{} [{}]", self.display_name, self.language_type)
    }

    pub fn with_quality(mut self, quality: u32) -> Self {
        self.quality = quality;
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Hls,
    Dash,
    Progressive,
}

/// Final, playable stream reference handed to the caller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub url: String,
    pub kind: SourceKind,
    pub headers: HashMap<String, String>,
    pub quality: u32,
    pub label: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerSlot {
    #[default]
    Auto,
    Index(u32),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanguagePreference {
    #[default]
    Auto,
    Sub,
    Softsub,
    Dub,
}

impl LanguagePreference {
    pub fn matches(&self, language: LanguageType) -> bool {
        match self {
            LanguagePreference::Auto => true,
            LanguagePreference::Sub => language == LanguageType::Sub,
            LanguagePreference::Softsub => language == LanguageType::Softsub,
            LanguagePreference::Dub => language == LanguageType::Dub,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preference {
    pub server_slot: ServerSlot,
    pub language_type: LanguagePreference,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AnimeCard {
    pub id: String,
    pub title: String,
    pub image: String,
    /// Whether the cover should be cropped to fill its slot.
    pub crop_cover: bool,
    pub subs: Option<u32>,
    pub dubs: Option<u32>,
}

impl AnimeCard {
    pub fn subtitle(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(subs) = self.subs {
            parts.push(format!("Sub: {}", subs));
        }
        if let Some(dubs) = self.dubs {
            parts.push(format!("Dub: {}", dubs));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Shelf {
    pub id: String,
    pub title: String,
    pub list_type: DisplayMode,
    pub animes: Vec<AnimeCard>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExternalLink {
    pub title: String,
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct AnimeDetails {
    pub id: String,
    pub anime_id: String,
    pub title: String,
    pub alt_title: String,
    pub image: String,
    pub crop_cover: bool,
    pub synopsis: String,
    pub rating: String,
    pub subs: u32,
    pub dubs: u32,
    pub total_episodes: u32,
    pub metadata: Vec<(String, String)>,
    pub links: Vec<ExternalLink>,
    pub description: String,
}

impl AnimeDetails {
    /// Metadata value for a label as printed on the page, e.g. `"Status:"`.
    pub fn meta(&self, label: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AnimeEpisode {
    pub token: String,
    pub episode_no: String,
    pub title: String,
    pub langs: String,
}
