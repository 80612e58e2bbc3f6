use std::time::Duration;

use chrono::Utc;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, REFERER, USER_AGENT as USER_AGENT_HEADER},
    Client,
};
use tracing::debug;

use crate::{error::Result, handle_error};

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const MEDIA_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:134.0) Gecko/20100101 Firefox/134.0";

/// Builds the shared client used for both the site and the codec service.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// Headers for a plain page fetch against the active mirror.
pub fn page_headers(base: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT_HEADER, HeaderValue::from_static(USER_AGENT));
    if let Ok(referer) = HeaderValue::from_str(&format!("{}/", base)) {
        headers.insert(REFERER, referer);
    }
    headers
}

/// Headers for the site's XHR endpoints.
pub fn ajax_headers(base: &str) -> HeaderMap {
    let mut headers = page_headers(base);
    headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
    headers
}

/// Headers for the player's media endpoint, referred from the iframe.
pub fn media_headers(iframe_url: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT_HEADER, HeaderValue::from_static(MEDIA_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("text/html, */*; q=0.01"));
    if let Ok(referer) = HeaderValue::from_str(iframe_url) {
        headers.insert(REFERER, referer);
    }
    headers
}

/// Fetches data from the specified URL.
///
/// Returns the body as text; transport failures and non-success statuses
/// surface as `AniKaiError::Transport`.
pub async fn get_curl(client: &Client, url: &str, headers: HeaderMap) -> Result<String> {
    debug!(%url, "GET");
    handle_error!(fetch(client, url, headers).await)
}

async fn fetch(client: &Client, url: &str, headers: HeaderMap) -> Result<String> {
    let response = client
        .get(url)
        .headers(headers)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.text().await?)
}

pub fn parse_usize(s: &str) -> Result<usize> {
    Ok(s.trim().parse::<usize>()?)
}

/// Wall-clock milliseconds, used where the site only needs a nonce.
pub fn now_millis() -> String {
    Utc::now().timestamp_millis().to_string()
}
