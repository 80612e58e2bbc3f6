use thiserror::Error;

/// Custom error enum to handle different types of errors
#[derive(Debug, Error)]
pub enum AniKaiError {
    /// Network or connection failure against the site or the codec service
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Expected envelope field absent or malformed
    #[error("Envelope unparseable: {0}")]
    EnvelopeUnparseable(String),
    /// The server list for an episode came back empty
    #[error("No delivery servers found for episode")]
    NoServersFound,
    /// The view endpoint or the iframe decode produced nothing
    #[error("Iframe reference could not be resolved")]
    IframeUnresolved,
    /// Every media decode endpoint was exhausted
    #[error("Media payload could not be decoded by any endpoint")]
    MediaUndecodable,
    /// Decoded media payload had no recognisable stream url
    #[error("No playable url found in decoded media payload")]
    NoPlayableUrlFound,
    /// Parsing int error
    #[error("Failed to parse int error: {0}")]
    ParseIntError(#[from] std::num::ParseIntError),
    /// A configuration value that cannot be mapped onto a setting
    #[error("Invalid value {value:?} for setting {key}")]
    InvalidSetting { key: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, AniKaiError>;

impl AniKaiError {
    /// True for the pipeline failures a caller is expected to diagnose.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AniKaiError::NoServersFound
                | AniKaiError::IframeUnresolved
                | AniKaiError::MediaUndecodable
                | AniKaiError::NoPlayableUrlFound
        )
    }

    pub fn envelope(what: impl Into<String>) -> Self {
        AniKaiError::EnvelopeUnparseable(what.into())
    }
}
