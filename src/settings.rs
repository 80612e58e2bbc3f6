use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    env::EnvVar,
    error::{AniKaiError, Result},
    model::{LanguagePreference, MirrorHost, Preference, ServerSlot},
    utils::parse_usize,
};

pub const DOMAINS: [&str; 4] = ["animekai.to", "animekai.cc", "animekai.ac", "anikai.to"];
pub const DEFAULT_CODEC_URL: &str = "https://enc-dec.app";
const DEFAULT_TIMEOUT_SECS: u64 = 20;

const SERVER_TITLES: [&str; 3] = ["Auto (First Available)", "Server 1", "Server 2"];
const TYPE_TITLES: [&str; 4] = ["Auto (First Available)", "Sub (Hardsub)", "Softsub", "Dub"];
const DISPLAY_TITLES: [&str; 2] = ["Grid", "Linear"];

/// How a client should lay out a shelf of cards.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Grid,
    Linear,
}

/// User-facing setting descriptor, as shown on a settings screen.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettingItem {
    List {
        key: &'static str,
        title: &'static str,
        entry_titles: Vec<&'static str>,
        entry_values: Vec<String>,
        default_index: usize,
    },
    Switch {
        key: &'static str,
        title: &'static str,
        summary: &'static str,
        default: bool,
    },
}

fn list_item(key: &'static str, title: &'static str, entries: &[&'static str]) -> SettingItem {
    SettingItem::List {
        key,
        title,
        entry_titles: entries.to_vec(),
        entry_values: (0..entries.len()).map(|i| i.to_string()).collect(),
        default_index: 0,
    }
}

pub fn setting_items() -> Vec<SettingItem> {
    vec![
        list_item("preferred_domain", "Preferred Domain", &DOMAINS),
        list_item("preferred_server", "Preferred Server", &SERVER_TITLES),
        list_item("preferred_type", "Preferred Language/Type", &TYPE_TITLES),
        list_item("display_mode", "List Display Mode", &DISPLAY_TITLES),
        SettingItem::Switch {
            key: "crop_covers",
            title: "Crop Album Covers",
            summary: "Enable to crop album cover images to fill the space",
            default: false,
        },
    ]
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub preferred_domain: usize,
    pub preferred_server: usize,
    pub preferred_type: usize,
    pub display_mode: DisplayMode,
    pub crop_covers: bool,
    pub codec_url: String,
    pub domains: Vec<String>,
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            preferred_domain: 0,
            preferred_server: 0,
            preferred_type: 0,
            display_mode: DisplayMode::Grid,
            crop_covers: false,
            codec_url: DEFAULT_CODEC_URL.to_string(),
            domains: DOMAINS.iter().map(|d| format!("https://{}", d)).collect(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Reads every `ANIMEKAI_*` variable on top of the defaults.
    pub fn from_env() -> Result<Self> {
        let mut settings = Settings::default();

        if let Some(list) = EnvVar::ANIMEKAI_DOMAINS.get_optional() {
            settings.domains = list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(url) = EnvVar::ANIMEKAI_CODEC_URL.get_optional() {
            settings.codec_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = EnvVar::ANIMEKAI_TIMEOUT_SECS.get_optional() {
            settings.timeout = Duration::from_secs(parse_usize(&secs)? as u64);
        }

        let keyed = [
            ("preferred_domain", EnvVar::ANIMEKAI_PREFERRED_DOMAIN),
            ("preferred_server", EnvVar::ANIMEKAI_PREFERRED_SERVER),
            ("preferred_type", EnvVar::ANIMEKAI_PREFERRED_TYPE),
            ("display_mode", EnvVar::ANIMEKAI_DISPLAY_MODE),
            ("crop_covers", EnvVar::ANIMEKAI_CROP_COVERS),
        ];
        for (key, var) in keyed {
            if let Some(value) = var.get_optional() {
                settings.set(key, &value)?;
            }
        }

        Ok(settings)
    }

    /// Applies one setting by its key; list settings take the entry value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let invalid = |key: &'static str| AniKaiError::InvalidSetting {
            key,
            value: value.to_string(),
        };

        match key {
            "preferred_domain" => {
                self.preferred_domain = parse_usize(value).map_err(|_| invalid("preferred_domain"))?
            }
            "preferred_server" => {
                self.preferred_server = parse_usize(value).map_err(|_| invalid("preferred_server"))?
            }
            "preferred_type" => {
                self.preferred_type = parse_usize(value).map_err(|_| invalid("preferred_type"))?
            }
            "display_mode" => {
                self.display_mode = match value {
                    "1" => DisplayMode::Linear,
                    "0" => DisplayMode::Grid,
                    _ => return Err(invalid("display_mode")),
                }
            }
            "crop_covers" => {
                self.crop_covers = match value.to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" => true,
                    "0" | "false" | "no" => false,
                    _ => return Err(invalid("crop_covers")),
                }
            }
            _ => {
                return Err(AniKaiError::InvalidSetting {
                    key: "unknown",
                    value: key.to_string(),
                })
            }
        }

        Ok(())
    }

    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.domains = domains;
        self
    }

    pub fn with_codec_url(mut self, url: impl Into<String>) -> Self {
        self.codec_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_preferred_domain(mut self, index: usize) -> Self {
        self.preferred_domain = index;
        self
    }

    /// Mirror candidates in probe order, preferred domain first.
    pub fn mirrors(&self) -> Vec<MirrorHost> {
        let mut mirrors: Vec<MirrorHost> = self
            .domains
            .iter()
            .map(|d| {
                if d.starts_with("http://") || d.starts_with("https://") {
                    MirrorHost::new(d.as_str())
                } else {
                    MirrorHost::new(format!("https://{}", d))
                }
            })
            .collect();

        if self.preferred_domain < mirrors.len() {
            let preferred = mirrors.remove(self.preferred_domain);
            mirrors.insert(0, preferred);
        }
        mirrors
    }

    /// Out-of-range indices fall back to `Auto`.
    pub fn preference(&self) -> Preference {
        let server_slot = match self.preferred_server {
            n @ 1..=2 => ServerSlot::Index(n as u32),
            _ => ServerSlot::Auto,
        };
        let language_type = match self.preferred_type {
            1 => LanguagePreference::Sub,
            2 => LanguagePreference::Softsub,
            3 => LanguagePreference::Dub,
            _ => LanguagePreference::Auto,
        };

        Preference {
            server_slot,
            language_type,
        }
    }
}
