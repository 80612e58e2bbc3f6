#![allow(dead_code)]

use std::time::Duration;

use kaiscraper::{AnimeKaiRust, Settings};
use serde_json::json;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

/// Settings whose mirror and codec service both point at `server`.
pub fn settings_for(server: &MockServer) -> Settings {
    Settings::default()
        .with_domains(vec![server.uri()])
        .with_codec_url(server.uri())
        .with_timeout(Duration::from_secs(5))
}

pub async fn kai_for(server: &MockServer) -> AnimeKaiRust {
    AnimeKaiRust::new(settings_for(server))
        .await
        .expect("client builds")
}

pub async fn mount_encode(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/enc-kai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "result": "ENCODED"
        })))
        .mount(server)
        .await;
}

pub fn envelope(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "status": 200, "result": result }))
}

pub const SERVER_LIST: &str = r#"<div class="server-items lang-group" data-id="sub"><span class="server" data-lid="lid-1">Server 1</span><span class="server" data-lid="lid-2">Server 2</span></div><div class="server-items lang-group" data-id="dub"><span class="server" data-lid="lid-3">Server 1</span></div>"#;
