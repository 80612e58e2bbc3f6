mod common;

use common::{envelope, kai_for, mount_encode, SERVER_LIST};
use kaiscraper::{
    AniKaiError, LanguagePreference, Preference, ServerSlot, SourceKind, MEDIA_USER_AGENT,
};
use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

async fn mount_server_list(server: &MockServer, html: &str) {
    Mock::given(method("GET"))
        .and(path("/ajax/links/list"))
        .and(query_param("token", "ep-token"))
        .respond_with(envelope(json!(html)))
        .mount(server)
        .await;
}

async fn mount_view(server: &MockServer, id: &str, view_token: &str) {
    Mock::given(method("GET"))
        .and(path("/ajax/links/view"))
        .and(query_param("id", id))
        .respond_with(envelope(json!(view_token)))
        .mount(server)
        .await;
}

async fn mount_iframe(server: &MockServer, view_token: &str, player: &str) {
    let iframe = format!("{}/e/{}", server.uri(), player);
    Mock::given(method("POST"))
        .and(path("/api/dec-kai"))
        .and(body_json(json!({ "text": view_token })))
        .respond_with(envelope(json!({ "url": iframe, "skip": {} })))
        .mount(server)
        .await;
}

async fn mount_media(server: &MockServer, player: &str, media_token: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/media/{}", player)))
        .respond_with(envelope(json!(media_token)))
        .mount(server)
        .await;
}

fn playable(url: &str) -> ResponseTemplate {
    envelope(json!({ "sources": [{ "file": url }], "tracks": [] }))
}

#[tokio::test]
async fn resolves_first_preferred_server_end_to_end() {
    let server = MockServer::start().await;
    mount_encode(&server).await;
    mount_server_list(&server, SERVER_LIST).await;
    mount_view(&server, "lid-1", "VIEW-1").await;
    mount_iframe(&server, "VIEW-1", "abc123").await;

    let iframe = format!("{}/e/abc123", server.uri());
    Mock::given(method("GET"))
        .and(path("/media/abc123"))
        .and(header("referer", iframe.as_str()))
        .respond_with(envelope(json!("MEDIA-1")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/dec-megaup"))
        .and(body_json(json!({ "text": "MEDIA-1", "agent": MEDIA_USER_AGENT })))
        .respond_with(playable("https://cdn.test/master.m3u8"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/dec-mega"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let kai = kai_for(&server).await;
    assert!(!kai.mirror_outcome().is_degraded());

    let source = kai
        .resolve_episode("ep-token", &Preference::default())
        .await
        .expect("resolves");

    assert_eq!(source.url, "https://cdn.test/master.m3u8");
    assert_eq!(source.kind, SourceKind::Hls);
    assert_eq!(source.quality, 720);
    assert_eq!(source.label, "Server 1 [sub]");
    assert_eq!(source.headers["Referer"], iframe);
}

#[tokio::test]
async fn listing_applies_preference_and_ranks() {
    let server = MockServer::start().await;
    mount_encode(&server).await;
    mount_server_list(&server, SERVER_LIST).await;
    let kai = kai_for(&server).await;

    let dub = Preference {
        server_slot: ServerSlot::Auto,
        language_type: LanguagePreference::Dub,
    };
    let servers = kai.list_delivery_servers("ep-token", &dub).await.unwrap();
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0].server_id, "lid-3");
    assert_eq!(servers[0].quality, 720);

    let sub_two = Preference {
        server_slot: ServerSlot::Index(2),
        language_type: LanguagePreference::Sub,
    };
    let servers = kai.list_delivery_servers("ep-token", &sub_two).await.unwrap();
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0].server_id, "lid-2");

    let all = kai
        .list_delivery_servers("ep-token", &Preference::default())
        .await
        .unwrap();
    let qualities: Vec<u32> = all.iter().map(|s| s.quality).collect();
    assert_eq!(qualities, vec![720, 620, 520]);
}

#[tokio::test]
async fn empty_server_list_stops_before_view() {
    let server = MockServer::start().await;
    mount_encode(&server).await;
    mount_server_list(&server, r#"<div class="server-items"></div>"#).await;
    Mock::given(path("/ajax/links/view"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(path("/api/dec-kai"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let kai = kai_for(&server).await;
    let err = kai
        .resolve_episode("ep-token", &Preference::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AniKaiError::NoServersFound));
}

#[tokio::test]
async fn server_list_without_result_is_unparseable() {
    let server = MockServer::start().await;
    mount_encode(&server).await;
    Mock::given(path("/ajax/links/list"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"error"}"#))
        .mount(&server)
        .await;

    let kai = kai_for(&server).await;
    let err = kai
        .list_delivery_servers("ep-token", &Preference::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AniKaiError::EnvelopeUnparseable(_)));
}

#[tokio::test]
async fn iframe_decode_failure_is_reported() {
    let server = MockServer::start().await;
    mount_encode(&server).await;
    mount_server_list(&server, SERVER_LIST).await;
    mount_view(&server, "lid-1", "VIEW-1").await;
    Mock::given(method("POST"))
        .and(path("/api/dec-kai"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":500}"#))
        .mount(&server)
        .await;

    let kai = kai_for(&server).await;
    let err = kai
        .resolve_episode("ep-token", &Preference::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AniKaiError::IframeUnresolved));
}

#[tokio::test]
async fn media_decode_falls_back_to_next_endpoint() {
    let server = MockServer::start().await;
    mount_encode(&server).await;
    mount_server_list(&server, SERVER_LIST).await;
    mount_view(&server, "lid-1", "VIEW-1").await;
    mount_iframe(&server, "VIEW-1", "p1").await;
    mount_media(&server, "p1", "MEDIA-1").await;

    Mock::given(method("POST"))
        .and(path("/api/dec-megaup"))
        .respond_with(envelope(json!("not an object")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/dec-mega"))
        .respond_with(playable("https://cdn.test/fallback.m3u8"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/decode"))
        .respond_with(playable("https://cdn.test/never.m3u8"))
        .expect(0)
        .mount(&server)
        .await;

    let kai = kai_for(&server).await;
    let source = kai
        .resolve_episode("ep-token", &Preference::default())
        .await
        .unwrap();
    assert_eq!(source.url, "https://cdn.test/fallback.m3u8");
}

#[tokio::test]
async fn exhausted_decoders_are_undecodable() {
    let server = MockServer::start().await;
    mount_encode(&server).await;
    mount_server_list(&server, SERVER_LIST).await;
    mount_view(&server, "lid-1", "VIEW-1").await;
    mount_iframe(&server, "VIEW-1", "p1").await;
    mount_media(&server, "p1", "MEDIA-1").await;
    for endpoint in ["/api/dec-megaup", "/api/dec-mega", "/api/decode"] {
        Mock::given(method("POST"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;
    }

    let kai = kai_for(&server).await;
    let err = kai
        .resolve_episode("ep-token", &Preference::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AniKaiError::MediaUndecodable));
}

#[tokio::test]
async fn decoded_media_without_url_is_not_playable() {
    let server = MockServer::start().await;
    mount_encode(&server).await;
    mount_server_list(&server, SERVER_LIST).await;
    mount_view(&server, "lid-1", "VIEW-1").await;
    mount_iframe(&server, "VIEW-1", "p1").await;
    mount_media(&server, "p1", "MEDIA-1").await;
    Mock::given(method("POST"))
        .and(path("/api/dec-megaup"))
        .respond_with(envelope(json!({ "tracks": [{ "label": "English" }] })))
        .mount(&server)
        .await;

    let kai = kai_for(&server).await;
    let err = kai
        .resolve_episode("ep-token", &Preference::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AniKaiError::NoPlayableUrlFound));
}

#[tokio::test]
async fn resolve_any_moves_past_a_broken_server() {
    let server = MockServer::start().await;
    mount_encode(&server).await;
    mount_server_list(&server, SERVER_LIST).await;
    Mock::given(method("GET"))
        .and(path("/ajax/links/view"))
        .and(query_param("id", "lid-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":404}"#))
        .mount(&server)
        .await;
    mount_view(&server, "lid-2", "VIEW-2").await;
    mount_iframe(&server, "VIEW-2", "p2").await;
    mount_media(&server, "p2", "MEDIA-2").await;
    Mock::given(method("POST"))
        .and(path("/api/dec-megaup"))
        .respond_with(playable("https://cdn.test/two.mp4"))
        .mount(&server)
        .await;

    let kai = kai_for(&server).await;
    let source = kai
        .resolve_any("ep-token", &Preference::default())
        .await
        .unwrap();
    assert_eq!(source.url, "https://cdn.test/two.mp4");
    assert_eq!(source.kind, SourceKind::Progressive);
    assert_eq!(source.quality, 620);
    assert_eq!(source.label, "Server 2 [sub]");
}

#[tokio::test]
async fn truncated_decode_reply_moves_to_next_endpoint() {
    let server = MockServer::start().await;
    mount_encode(&server).await;
    mount_server_list(&server, SERVER_LIST).await;
    mount_view(&server, "lid-1", "VIEW-1").await;
    mount_iframe(&server, "VIEW-1", "p1").await;
    mount_media(&server, "p1", "MEDIA-1").await;

    Mock::given(method("POST"))
        .and(path("/api/dec-megaup"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"status":200,"result":{"sources":{"file":"https://cdn.test/cut.m3u8"}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/dec-mega"))
        .respond_with(playable("https://cdn.test/whole.m3u8"))
        .expect(1)
        .mount(&server)
        .await;

    let kai = kai_for(&server).await;
    let source = kai
        .resolve_episode("ep-token", &Preference::default())
        .await
        .unwrap();
    assert_eq!(source.url, "https://cdn.test/whole.m3u8");
}
