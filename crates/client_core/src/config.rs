use std::{fs, path::Path};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "gef.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid api_base {value:?}: {source}")]
    InvalidApiBase {
        value: String,
        source: url::ParseError,
    },
    #[error("api_base must use http or https, got {0:?}")]
    UnsupportedScheme(String),
    #[error("event_buffer must be greater than zero")]
    EmptyEventBuffer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base: String,
    pub event_buffer: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8080/api".into(),
            event_buffer: 1024,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base: Option<String>,
    event_buffer: Option<usize>,
}

impl ClientSettings {
    pub fn apply_file_contents(&mut self, raw: &str) {
        if let Ok(file_cfg) = toml::from_str::<FileSettings>(raw) {
            if let Some(v) = file_cfg.api_base {
                self.api_base = v;
            }
            if let Some(v) = file_cfg.event_buffer {
                self.event_buffer = v;
            }
        }
    }

    /// Later keys win, so `APP__API_BASE` overrides `GEF_API_BASE`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for key in ["GEF_API_BASE", "APP__API_BASE"] {
            if let Some(v) = lookup(key) {
                self.api_base = v;
            }
        }

        if let Some(v) = lookup("APP__EVENT_BUFFER") {
            if let Ok(parsed) = v.parse::<usize>() {
                self.event_buffer = parsed;
            }
        }
    }

    pub fn validate(&self) -> Result<Url, ConfigError> {
        if self.event_buffer == 0 {
            return Err(ConfigError::EmptyEventBuffer);
        }
        let url = Url::parse(&self.api_base).map_err(|source| ConfigError::InvalidApiBase {
            value: self.api_base.clone(),
            source,
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }
        Ok(url)
    }
}

/// Defaults, then the settings file if it exists, then the environment.
pub fn load_settings(path: Option<&Path>) -> ClientSettings {
    let mut settings = ClientSettings::default();

    let path = path.unwrap_or_else(|| Path::new(DEFAULT_SETTINGS_FILE));
    if let Ok(raw) = fs::read_to_string(path) {
        settings.apply_file_contents(&raw);
    }

    settings.apply_env(|key| std::env::var(key).ok());
    settings
}
