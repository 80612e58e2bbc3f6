//! Client for the remote encode/decode service the site relies on.
//!
//! The service is a third party with no availability guarantee, so every
//! operation here recovers locally instead of surfacing errors: `encode`
//! degrades to a timestamp and the decoders return `None`.

use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    envelope::{extract_closed_object_result, extract_result_field, extract_url_field},
    error::{AniKaiError, Result},
    fallback::{try_in_order, Attempt},
    model::Outcome,
    utils::{now_millis, USER_AGENT},
};

/// A media decode endpoint, tried in list order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeEndpoint {
    pub name: &'static str,
    pub path: &'static str,
}

pub const MEDIA_DECODE_ENDPOINTS: [DecodeEndpoint; 3] = [
    DecodeEndpoint {
        name: "dec-megaup",
        path: "/api/dec-megaup",
    },
    DecodeEndpoint {
        name: "dec-mega",
        path: "/api/dec-mega",
    },
    DecodeEndpoint {
        name: "decode",
        path: "/api/decode",
    },
];

const ENCODE_PATH: &str = "/api/enc-kai";
const DECODE_IFRAME_PATH: &str = "/api/dec-kai";

#[derive(Debug, Clone)]
pub struct CodecClient {
    client: Client,
    base_url: String,
    media_endpoints: Vec<DecodeEndpoint>,
}

impl CodecClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        CodecClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            media_endpoints: MEDIA_DECODE_ENDPOINTS.to_vec(),
        }
    }

    pub fn with_media_endpoints(mut self, endpoints: Vec<DecodeEndpoint>) -> Self {
        self.media_endpoints = endpoints;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Obfuscates `text` for use as the site's `_` query parameter.
    ///
    /// Known approximation: when the service is unreachable or its reply has
    /// no `result`, the current timestamp in milliseconds is returned as a
    /// `Degraded` value. The site only uses the value as a nonce.
    pub async fn encode(&self, text: &str) -> Outcome<String> {
        match self.try_encode(text).await {
            Ok(Some(encoded)) => Outcome::Genuine(encoded),
            Ok(None) => {
                warn!(%text, "encode reply had no result, using timestamp nonce");
                Outcome::Degraded(now_millis())
            }
            Err(e) => {
                warn!(%text, error = %e, "encode failed, using timestamp nonce");
                Outcome::Degraded(now_millis())
            }
        }
    }

    async fn try_encode(&self, text: &str) -> Result<Option<String>> {
        let url = format!("{}{}", self.base_url, ENCODE_PATH);
        let body = self
            .client
            .get(&url)
            .query(&[("text", text)])
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?
            .text()
            .await?;

        Ok(extract_result_field(&body))
    }

    /// Decodes the view endpoint's token into the player iframe url.
    pub async fn decode_iframe(&self, token: &str) -> Option<String> {
        let url = format!("{}{}", self.base_url, DECODE_IFRAME_PATH);
        match self.post_text(&url, json!({ "text": token })).await {
            Ok(body) => {
                let iframe = extract_url_field(&body);
                if iframe.is_none() {
                    debug!("iframe decode reply had no url field");
                }
                iframe
            }
            Err(e) => {
                debug!(error = %e, "iframe decode failed");
                None
            }
        }
    }

    /// Decodes the player's media payload, trying each endpoint in order.
    ///
    /// Returns the decoded object as text. Only exhaustion of every endpoint
    /// yields `None`.
    pub async fn decode_media(&self, token: &str, agent: &str) -> Option<String> {
        let body = json!({ "text": token, "agent": agent });
        let attempts = self
            .media_endpoints
            .iter()
            .map(|endpoint| {
                let url = format!("{}{}", self.base_url, endpoint.path);
                let body = body.clone();
                Attempt::new(endpoint.name, move || async move {
                    let reply = self.post_text(&url, body).await?;
                    let decoded = extract_closed_object_result(&reply).filter(|r| has_content(r));
                    Ok::<_, AniKaiError>(decoded)
                })
            })
            .collect();

        try_in_order(attempts).await
    }

    async fn post_text(&self, url: &str, body: serde_json::Value) -> Result<String> {
        let reply = self
            .client
            .post(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(&body)
            .send()
            .await?
            .text()
            .await?;
        Ok(reply)
    }
}

/// Rejects `{}`; a decoded payload must carry something.
fn has_content(object: &str) -> bool {
    object.len() > 2
}
