use std::collections::HashMap;
use std::fmt;

use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    catalog::{extract_anime_cards, extract_anime_details, extract_episodes, extract_related},
    codec::CodecClient,
    domain::select_active_mirror,
    envelope::extract_result_field,
    error::{AniKaiError, Result},
    extract::{extract_stream_url, infer_kind},
    handle_error,
    model::{
        AnimeCard, AnimeDetails, AnimeEpisode, DeliveryServer, MirrorHost, Outcome, Preference,
        Shelf, SourceDescriptor,
    },
    servers::{extract_delivery_servers, filter_servers, rank_servers},
    settings::Settings,
    utils::{
        ajax_headers, build_client, get_curl, media_headers, page_headers, MEDIA_USER_AGENT,
        USER_AGENT,
    },
};

const HOME_CATEGORIES: [(&str, &str); 4] = [
    ("Trending", "/trending"),
    ("Latest", "/updates"),
    ("Recent", "/recent"),
    ("Completed", "/completed"),
];
const SHELF_LIMIT: usize = 10;

/// Stages of resolving one episode into a playable source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStage {
    Init,
    DomainReady,
    ServerListFetched,
    ServerChosen,
    IframeResolved,
    MediaFetched,
    MediaDecoded,
    UrlExtracted,
}

impl fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolutionStage::Init => "init",
            ResolutionStage::DomainReady => "domain-ready",
            ResolutionStage::ServerListFetched => "server-list-fetched",
            ResolutionStage::ServerChosen => "server-chosen",
            ResolutionStage::IframeResolved => "iframe-resolved",
            ResolutionStage::MediaFetched => "media-fetched",
            ResolutionStage::MediaDecoded => "media-decoded",
            ResolutionStage::UrlExtracted => "url-extracted",
        };
        f.write_str(name)
    }
}

/// AnimeKai client: catalog browsing plus stream resolution.
///
/// The active mirror is chosen once in [`AnimeKaiRust::new`] and stays fixed
/// until [`AnimeKaiRust::initialize`] runs again. Every other method takes
/// `&self`, so one instance can serve concurrent resolutions.
#[derive(Debug, Clone)]
pub struct AnimeKaiRust {
    settings: Settings,
    client: Client,
    codec: CodecClient,
    mirror: Outcome<MirrorHost>,
}

impl AnimeKaiRust {
    pub async fn new(settings: Settings) -> Result<Self> {
        let client = build_client(settings.timeout)?;
        let codec = CodecClient::new(client.clone(), settings.codec_url.clone());
        info!(
            stage = %ResolutionStage::Init,
            codec = %codec.base_url(),
            "starting animekai client"
        );

        let mirror = select_active_mirror(&client, &settings.mirrors()).await;
        log_mirror(&mirror);

        Ok(AnimeKaiRust {
            settings,
            client,
            codec,
            mirror,
        })
    }

    /// Re-runs mirror selection over `mirrors`, replacing the active host.
    pub async fn initialize(&mut self, mirrors: &[MirrorHost]) {
        self.mirror = select_active_mirror(&self.client, mirrors).await;
        log_mirror(&self.mirror);
    }

    pub fn active_mirror(&self) -> &MirrorHost {
        self.mirror.value()
    }

    pub fn mirror_outcome(&self) -> &Outcome<MirrorHost> {
        &self.mirror
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn codec(&self) -> &CodecClient {
        &self.codec
    }

    fn url_with_params(&self, path: &str, params: &[(&str, &str)]) -> String {
        let base = self.active_mirror().join(path);
        match Url::parse_with_params(&base, params) {
            Ok(url) => url.to_string(),
            Err(_) => {
                let query: Vec<String> =
                    params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                format!("{}?{}", base, query.join("&"))
            }
        }
    }

    async fn get_page(&self, url: &str) -> Result<String> {
        get_curl(&self.client, url, page_headers(self.active_mirror().as_str())).await
    }

    async fn get_ajax_result(&self, url: &str, what: &str) -> Result<Option<String>> {
        let body = get_curl(&self.client, url, ajax_headers(self.active_mirror().as_str())).await?;
        let result = extract_result_field(&body);
        if result.is_none() {
            debug!(%url, what, "envelope had no result field");
        }
        Ok(result)
    }

    fn apply_cover_crop(&self, mut cards: Vec<AnimeCard>) -> Vec<AnimeCard> {
        for card in &mut cards {
            card.crop_cover = self.settings.crop_covers && !card.image.is_empty();
        }
        cards
    }

    fn shelf(&self, id: &str, title: String, animes: Vec<AnimeCard>) -> Shelf {
        Shelf {
            id: id.to_string(),
            title,
            list_type: self.settings.display_mode,
            animes,
        }
    }

    pub async fn search(&self, query: &str, page: u32) -> Vec<AnimeCard> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        let page = page.max(1).to_string();
        let url = self.url_with_params(
            "/browser",
            &[("keyword", query.trim()), ("page", page.as_str())],
        );
        match self.get_page(&url).await {
            Ok(html) => {
                let cards = self.apply_cover_crop(extract_anime_cards(&html, None));
                info!(%query, results = cards.len(), "search finished");
                cards
            }
            Err(e) => {
                warn!(%query, error = %e, "search failed");
                Vec::new()
            }
        }
    }

    /// Search results as a single shelf titled with the result count.
    pub async fn search_feed(&self, query: &str, page: u32) -> Vec<Shelf> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        let cards = self.search(query, page).await;
        vec![self.shelf("search", format!("Results ({})", cards.len()), cards)]
    }

    pub async fn home_feed(&self) -> Vec<Shelf> {
        let mut shelves = Vec::new();

        for (title, path) in HOME_CATEGORIES {
            let url = self.active_mirror().join(path);
            let html = match self.get_page(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(shelf = title, error = %e, "skipping home shelf");
                    continue;
                }
            };

            let animes = self.apply_cover_crop(extract_anime_cards(&html, Some(SHELF_LIMIT)));
            if animes.is_empty() {
                continue;
            }
            debug!(shelf = title, items = animes.len(), "home shelf loaded");
            shelves.push(self.shelf(&title.to_lowercase(), title.to_string(), animes));
        }

        shelves
    }

    pub async fn anime_details(&self, anime_url: &str) -> Option<AnimeDetails> {
        let url = self.active_mirror().join(anime_url);
        match self.get_page(&url).await {
            Ok(html) => {
                let mut details = extract_anime_details(&html, anime_url);
                details.crop_cover = self.settings.crop_covers && !details.image.is_empty();
                info!(
                    anime_id = %details.anime_id,
                    subs = details.subs,
                    dubs = details.dubs,
                    "details loaded"
                );
                Some(details)
            }
            Err(e) => {
                warn!(%url, error = %e, "details failed");
                None
            }
        }
    }

    pub async fn related(&self, anime_url: &str) -> Vec<AnimeCard> {
        let url = self.active_mirror().join(anime_url);
        match self.get_page(&url).await {
            Ok(html) => self.apply_cover_crop(extract_related(&html)),
            Err(e) => {
                warn!(%url, error = %e, "related failed");
                Vec::new()
            }
        }
    }

    pub async fn related_feed(&self, anime_url: &str) -> Option<Shelf> {
        let related = self.related(anime_url).await;
        if related.is_empty() {
            return None;
        }
        Some(self.shelf("related", "Related Anime".to_string(), related))
    }

    pub async fn episodes(&self, anime_id: &str) -> Vec<AnimeEpisode> {
        if anime_id.trim().is_empty() {
            warn!("no anime id to list episodes for");
            return Vec::new();
        }

        let nonce = self.codec.encode(anime_id).await.into_inner();
        let url = self.url_with_params(
            "/ajax/episodes/list",
            &[("ani_id", anime_id), ("_", nonce.as_str())],
        );
        match self.get_ajax_result(&url, "episodes").await {
            Ok(Some(html)) => {
                let episodes = extract_episodes(&html);
                info!(%anime_id, episodes = episodes.len(), "episodes loaded");
                episodes
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(%anime_id, error = %e, "episodes failed");
                Vec::new()
            }
        }
    }

    /// Delivery servers for an episode, filtered by preference and ranked.
    pub async fn list_delivery_servers(
        &self,
        episode_token: &str,
        preference: &Preference,
    ) -> Result<Vec<DeliveryServer>> {
        handle_error!(
            self.fetch_servers(episode_token, preference).await,
            ResolutionStage::ServerListFetched
        )
    }

    async fn fetch_servers(
        &self,
        episode_token: &str,
        preference: &Preference,
    ) -> Result<Vec<DeliveryServer>> {
        let nonce = self.codec.encode(episode_token).await.into_inner();
        let url = self.url_with_params(
            "/ajax/links/list",
            &[("token", episode_token), ("_", nonce.as_str())],
        );

        let html = self
            .get_ajax_result(&url, "links/list")
            .await?
            .ok_or_else(|| AniKaiError::envelope("server list response has no result"))?;

        let servers = extract_delivery_servers(&html);
        if servers.is_empty() {
            return Err(AniKaiError::NoServersFound);
        }
        info!(stage = %ResolutionStage::ServerListFetched, servers = servers.len());

        let filtered = rank_servers(filter_servers(servers, preference));
        debug!(?preference, remaining = filtered.len(), "servers filtered");
        Ok(filtered)
    }

    /// Runs the pipeline for the most preferred server of an episode.
    pub async fn resolve_episode(
        &self,
        episode_token: &str,
        preference: &Preference,
    ) -> Result<SourceDescriptor> {
        let servers = self.list_delivery_servers(episode_token, preference).await?;
        let chosen = servers.first().ok_or(AniKaiError::NoServersFound)?;
        self.resolve_source(chosen).await
    }

    /// Tries each preferred server in turn until one resolves.
    pub async fn resolve_any(
        &self,
        episode_token: &str,
        preference: &Preference,
    ) -> Result<SourceDescriptor> {
        let servers = self.list_delivery_servers(episode_token, preference).await?;
        let mut last_error = AniKaiError::NoServersFound;

        for server in &servers {
            match self.resolve_source(server).await {
                Ok(source) => return Ok(source),
                Err(e) => {
                    warn!(server = %server.label(), error = %e, "server failed, trying next");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Resolves one delivery server into a playable source.
    pub async fn resolve_source(&self, server: &DeliveryServer) -> Result<SourceDescriptor> {
        info!(
            stage = %ResolutionStage::ServerChosen,
            server = %server.label(),
            id = %server.server_id
        );

        let iframe_url = handle_error!(
            self.resolve_iframe(&server.server_id).await,
            ResolutionStage::IframeResolved
        )?;
        info!(stage = %ResolutionStage::IframeResolved, iframe = %iframe_url);

        let encoded_media = handle_error!(
            self.fetch_media(&iframe_url).await,
            ResolutionStage::MediaFetched
        )?;
        debug!(stage = %ResolutionStage::MediaFetched, len = encoded_media.len());

        let decoded = handle_error!(
            self.codec
                .decode_media(&encoded_media, MEDIA_USER_AGENT)
                .await
                .ok_or(AniKaiError::MediaUndecodable),
            ResolutionStage::MediaDecoded
        )?;
        debug!(stage = %ResolutionStage::MediaDecoded, len = decoded.len());

        let url = handle_error!(
            extract_stream_url(&decoded)
                .await
                .ok_or(AniKaiError::NoPlayableUrlFound),
            ResolutionStage::UrlExtracted
        )?;
        info!(stage = %ResolutionStage::UrlExtracted, %url);

        Ok(build_source(url, &iframe_url, server))
    }

    async fn resolve_iframe(&self, server_id: &str) -> Result<String> {
        let nonce = self.codec.encode(server_id).await.into_inner();
        let url = self.url_with_params(
            "/ajax/links/view",
            &[("id", server_id), ("_", nonce.as_str())],
        );

        let token = self
            .get_ajax_result(&url, "links/view")
            .await?
            .filter(|t| !t.is_empty())
            .ok_or(AniKaiError::IframeUnresolved)?;

        self.codec
            .decode_iframe(&token)
            .await
            .filter(|u| !u.is_empty())
            .ok_or(AniKaiError::IframeUnresolved)
    }

    async fn fetch_media(&self, iframe_url: &str) -> Result<String> {
        let media_url = playback_to_media(iframe_url);
        let body = get_curl(&self.client, &media_url, media_headers(iframe_url)).await?;

        extract_result_field(&body)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| AniKaiError::envelope("media response has no result"))
    }
}

fn log_mirror(mirror: &Outcome<MirrorHost>) {
    info!(
        stage = %ResolutionStage::DomainReady,
        mirror = %mirror.value(),
        degraded = mirror.is_degraded()
    );
}

/// Rewrites the player path (`/e/` or `/e2/`) to its media endpoint.
pub fn playback_to_media(iframe_url: &str) -> String {
    iframe_url.replace("/e/", "/media/").replace("/e2/", "/media/")
}

fn build_source(url: String, iframe_url: &str, server: &DeliveryServer) -> SourceDescriptor {
    let headers = HashMap::from([
        ("User-Agent".to_string(), USER_AGENT.to_string()),
        ("Referer".to_string(), iframe_url.to_string()),
    ]);

    SourceDescriptor {
        kind: infer_kind(&url),
        url,
        headers,
        quality: server.quality,
        label: server.label(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LanguageType, SourceKind};

    #[test]
    fn playback_paths_are_rewritten() {
        assert_eq!(
            playback_to_media("https://mega.test/e/abc?autostart=true"),
            "https://mega.test/media/abc?autostart=true"
        );
        assert_eq!(
            playback_to_media("https://mega.test/e2/abc"),
            "https://mega.test/media/abc"
        );
        assert_eq!(
            playback_to_media("https://mega.test/embed/abc"),
            "https://mega.test/embed/abc"
        );
    }

    #[test]
    fn source_carries_server_quality_and_referer() {
        let server = DeliveryServer {
            server_id: "lid".into(),
            display_name: "Server 1".into(),
            language_type: LanguageType::Dub,
            slot_index: 1,
            quality: 620,
        };
        let source = build_source(
            "https://cdn.test/list.m3u8".into(),
            "https://mega.test/e/abc",
            &server,
        );
        assert_eq!(source.kind, SourceKind::Hls);
        assert_eq!(source.quality, 620);
        assert_eq!(source.label, "Server 1 [dub]");
        assert_eq!(source.headers["Referer"], "https://mega.test/e/abc");
        assert_eq!(source.headers["User-Agent"], USER_AGENT);
    }

    #[test]
    fn stage_names() {
        assert_eq!(ResolutionStage::MediaDecoded.to_string(), "media-decoded");
        assert_eq!(ResolutionStage::Init.to_string(), "init");
    }
}
