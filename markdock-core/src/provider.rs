use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::NewsConfig;
use crate::error::ProviderError;
use crate::models::{Article, CurrentsArticle, CurrentsResponse};

/// Thin client for the Currents `latest-news` endpoint.
#[derive(Debug, Clone)]
pub struct CurrentsClient {
    client: Client,
    endpoint: String,
    language: String,
    category: String,
    timeout: Duration,
}

impl CurrentsClient {
    pub fn new(client: Client, config: &NewsConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            language: config.language.clone(),
            category: config.category.clone(),
            timeout: config.request_timeout(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn latest(&self, api_key: &str) -> Result<Vec<Article>, ProviderError> {
        match tokio::time::timeout(self.timeout, self.request(api_key)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout)),
        }
    }

    async fn request(&self, api_key: &str) -> Result<Vec<Article>, ProviderError> {
        debug!(endpoint = %self.endpoint, category = %self.category, "requesting latest news");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("apiKey", api_key),
                ("language", self.language.as_str()),
                ("category", self.category.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        let payload: CurrentsResponse = serde_json::from_slice(&bytes)?;
        if let Some(state) = payload.status.as_deref() {
            if !state.eq_ignore_ascii_case("ok") {
                let reason = payload.msg.unwrap_or_else(|| state.to_owned());
                return Err(ProviderError::Rejected(reason));
            }
        }

        // Entries that fail to decode are dropped one by one.
        let articles: Vec<Article> = payload
            .news
            .into_iter()
            .enumerate()
            .filter_map(|(index, raw)| match serde_json::from_value::<CurrentsArticle>(raw) {
                Ok(article) => Some(Article::from_currents(article)),
                Err(err) => {
                    warn!(index, error = %err, "skipping malformed news entry");
                    None
                }
            })
            .collect();
        info!(count = articles.len(), "fetched latest news");
        Ok(articles)
    }
}
