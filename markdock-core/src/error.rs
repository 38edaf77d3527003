use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NewsError {
    #[error("API key is missing, please check settings")]
    MissingApiKey,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("failed to encode news for the frontend: {0}")]
    Encode(serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to fetch news: {0}")]
    Network(#[from] reqwest::Error),
    #[error("API returned status code: {0}")]
    Status(u16),
    #[error("malformed news payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("news provider rejected the request: {0}")]
    Rejected(String),
    #[error("news provider did not answer within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not locate a configuration directory")]
    NoConfigDir,
    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
