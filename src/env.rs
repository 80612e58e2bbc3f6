// env.rs

use std::env;

use dotenvy::dotenv;

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy)]
pub enum EnvVar {
    ANIMEKAI_DOMAINS,
    ANIMEKAI_CODEC_URL,
    ANIMEKAI_PREFERRED_DOMAIN,
    ANIMEKAI_PREFERRED_SERVER,
    ANIMEKAI_PREFERRED_TYPE,
    ANIMEKAI_DISPLAY_MODE,
    ANIMEKAI_CROP_COVERS,
    ANIMEKAI_TIMEOUT_SECS,
}

impl EnvVar {
    // Convert EnvVar to the corresponding environment variable key
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvVar::ANIMEKAI_DOMAINS => "ANIMEKAI_DOMAINS",
            EnvVar::ANIMEKAI_CODEC_URL => "ANIMEKAI_CODEC_URL",
            EnvVar::ANIMEKAI_PREFERRED_DOMAIN => "ANIMEKAI_PREFERRED_DOMAIN",
            EnvVar::ANIMEKAI_PREFERRED_SERVER => "ANIMEKAI_PREFERRED_SERVER",
            EnvVar::ANIMEKAI_PREFERRED_TYPE => "ANIMEKAI_PREFERRED_TYPE",
            EnvVar::ANIMEKAI_DISPLAY_MODE => "ANIMEKAI_DISPLAY_MODE",
            EnvVar::ANIMEKAI_CROP_COVERS => "ANIMEKAI_CROP_COVERS",
            EnvVar::ANIMEKAI_TIMEOUT_SECS => "ANIMEKAI_TIMEOUT_SECS",
        }
    }

    // Fetch the environment variable value, empty when unset
    pub fn get_config(&self) -> String {
        dotenv().ok();

        env::var(self.as_str())
            .map(|val| val.trim().to_string())
            .unwrap_or_default()
    }

    /// Value of the variable, or `None` when unset or blank.
    pub fn get_optional(&self) -> Option<String> {
        let val = self.get_config();
        if val.is_empty() {
            None
        } else {
            Some(val)
        }
    }
}
