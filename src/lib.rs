// src/lib.rs

mod animekai;
mod catalog;
mod codec;
mod domain;
mod env;
mod envelope;
mod error;
mod extract;
mod fallback;
mod macros;
mod model;
mod servers;
mod settings;
mod utils;

pub use crate::animekai::{playback_to_media, AnimeKaiRust, ResolutionStage};
pub use crate::catalog::{
    build_description, extract_anime_cards, extract_anime_details, extract_episodes,
    extract_related,
};
pub use crate::codec::{CodecClient, DecodeEndpoint, MEDIA_DECODE_ENDPOINTS};
pub use crate::domain::select_active_mirror;
pub use crate::env::EnvVar;
pub use crate::envelope::{
    extract_balanced_object_result, extract_closed_object_result, extract_result_field,
    extract_url_field,
};
pub use crate::error::{AniKaiError, Result};
pub use crate::extract::{extract_stream_url, infer_kind, ExtractionPattern, EXTRACTION_PATTERNS};
pub use crate::fallback::{try_in_order, Attempt};
pub use crate::model::*;
pub use crate::servers::{extract_delivery_servers, filter_servers, rank_servers};
pub use crate::settings::{
    setting_items, DisplayMode, SettingItem, Settings, DEFAULT_CODEC_URL, DOMAINS,
};
pub use crate::utils::{build_client, MEDIA_USER_AGENT, USER_AGENT};

#[derive(Debug)]
pub struct AniKai {
    pub anime_kai: AnimeKaiRust,
}

impl AniKai {
    /// Builds a client from `ANIMEKAI_*` environment settings.
    pub async fn new() -> Result<Self> {
        Self::with_settings(Settings::from_env()?).await
    }

    pub async fn with_settings(settings: Settings) -> Result<Self> {
        Ok(AniKai {
            anime_kai: AnimeKaiRust::new(settings).await?,
        })
    }
}
