use std::sync::Arc;

use reqwest::Client;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::cache::NewsCache;
use crate::config::{Config, Theme, API_KEY_ENV};
use crate::error::{NewsError, SettingsError};
use crate::models::{Article, NewsFeed};
use crate::provider::CurrentsClient;
use crate::settings::SettingsStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyStatus {
    FromEnv,
    FromConfig,
    /// The frontend should ask the user for a key.
    Missing,
}

/// Everything the frontend talks to: settings persistence and cached news.
#[derive(Debug)]
pub struct Backend {
    settings: SettingsStore,
    news: NewsCache,
    api_key: RwLock<Option<String>>,
}

impl Backend {
    /// Builds the news cache from the persisted news settings.
    pub async fn new(settings: SettingsStore, client: Client) -> Self {
        let config = settings.load().await;
        let provider = CurrentsClient::new(client, &config.news);
        let news = NewsCache::new(provider, config.news.freshness());
        Self::with_news_cache(settings, news)
    }

    pub fn with_news_cache(settings: SettingsStore, news: NewsCache) -> Self {
        Self {
            settings,
            news,
            api_key: RwLock::new(None),
        }
    }

    pub async fn startup(&self) -> ApiKeyStatus {
        self.resolve_api_key(std::env::var(API_KEY_ENV).ok()).await
    }

    /// The environment wins over the stored key.
    pub async fn resolve_api_key(&self, from_env: Option<String>) -> ApiKeyStatus {
        if let Some(key) = from_env.filter(|key| !key.trim().is_empty()) {
            *self.api_key.write().await = Some(key.trim().to_owned());
            info!("using news API key from environment");
            return ApiKeyStatus::FromEnv;
        }

        let config = self.settings.load().await;
        if config.has_api_key() {
            *self.api_key.write().await = Some(config.currents_api_key.trim().to_owned());
            info!("using news API key from settings");
            return ApiKeyStatus::FromConfig;
        }

        warn!("no news API key configured");
        ApiKeyStatus::Missing
    }

    pub async fn load_settings(&self) -> Config {
        self.settings.load().await
    }

    pub async fn save_settings(&self, symbol: &str, theme: Theme) -> Result<(), SettingsError> {
        self.settings.save(symbol, theme).await
    }

    /// Takes effect for the next fetch even if persisting fails.
    pub async fn save_api_key(&self, api_key: &str) -> Result<(), SettingsError> {
        let trimmed = api_key.trim();
        *self.api_key.write().await = (!trimmed.is_empty()).then(|| trimmed.to_owned());
        self.settings.save_api_key(trimmed).await
    }

    pub async fn has_api_key(&self) -> bool {
        self.api_key.read().await.is_some()
    }

    pub async fn fetch_news(&self) -> Result<Arc<[Article]>, NewsError> {
        let api_key = self.api_key.read().await.clone();
        self.news.fetch(api_key.as_deref()).await
    }

    /// Same as [`Backend::fetch_news`], encoded as `{"news": [...]}`.
    pub async fn fetch_news_json(&self) -> Result<String, NewsError> {
        let articles = self.fetch_news().await?;
        let feed = NewsFeed::from(articles.to_vec());
        serde_json::to_string(&feed).map_err(NewsError::Encode)
    }

    pub async fn refresh_news(&self) -> Result<Arc<[Article]>, NewsError> {
        self.news.invalidate();
        self.fetch_news().await
    }

    pub async fn cached_news_age(&self) -> i64 {
        self.news.cached_age_minutes().await
    }

    pub fn news_cache(&self) -> &NewsCache {
        &self.news
    }
}
