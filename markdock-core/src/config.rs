use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::SettingsError;

pub const DEFAULT_SYMBOL: &str = "NASDAQ:GOOGL";
pub const API_KEY_ENV: &str = "CURRENTS_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub currents_api_key: String,
    #[serde(default)]
    pub news: NewsConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub endpoint: String,
    pub language: String,
    pub category: String,
    pub freshness_minutes: u64,
    pub request_timeout_seconds: u64,
}

fn default_symbol() -> String {
    DEFAULT_SYMBOL.to_owned()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            theme: Theme::default(),
            currents_api_key: String::new(),
            news: NewsConfig::default(),
        }
    }
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.currentsapi.services/v1/latest-news".to_owned(),
            language: "en".to_owned(),
            category: "business".to_owned(),
            freshness_minutes: 60,
            request_timeout_seconds: 10,
        }
    }
}

impl NewsConfig {
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_minutes.saturating_mul(60))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Config {
    /// Platform config location: `<config dir>/markdock/config.json`.
    pub fn config_file_path() -> Result<PathBuf, SettingsError> {
        let config_dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(config_dir.join("markdock").join("config.json"))
    }

    pub fn has_api_key(&self) -> bool {
        !self.currents_api_key.trim().is_empty()
    }
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown theme `{0}`")]
pub struct UnknownTheme(pub String);

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            _ => Err(UnknownTheme(s.to_owned())),
        }
    }
}
