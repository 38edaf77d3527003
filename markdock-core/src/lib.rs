pub mod backend;
pub mod cache;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod provider;
pub mod settings;

pub use backend::{ApiKeyStatus, Backend};
pub use cache::{CachedNews, Clock, NewsCache, SystemClock};
pub use config::{Config, NewsConfig, Theme};
pub use error::{NewsError, ProviderError, SettingsError};
pub use models::{Article, NewsFeed};
pub use provider::CurrentsClient;
pub use settings::SettingsStore;
