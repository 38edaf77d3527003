use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::NewsError;
use crate::models::Article;
use crate::provider::CurrentsClient;

pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct CachedNews {
    pub articles: Arc<[Article]>,
    pub fetched_at: DateTime<Utc>,
}

/// Cache-aside wrapper around the news provider.
///
/// Holds a single slot that is swapped whole on every successful refresh.
/// Provider calls are serialised through `fetch_gate`: a caller that arrives
/// while a refresh is running waits for it and then re-reads the slot, so at
/// most one request is ever in flight. A failed refresh is reported to the
/// caller and the previous slot stays as it was.
#[derive(Debug)]
pub struct NewsCache {
    provider: CurrentsClient,
    freshness: Duration,
    clock: Arc<dyn Clock>,
    entry: RwLock<Option<CachedNews>>,
    invalidated: AtomicBool,
    fetch_gate: Mutex<()>,
}

impl NewsCache {
    pub fn new(provider: CurrentsClient, freshness: Duration) -> Self {
        Self {
            provider,
            freshness,
            clock: Arc::new(SystemClock),
            entry: RwLock::new(None),
            invalidated: AtomicBool::new(false),
            fetch_gate: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    pub async fn fetch(&self, api_key: Option<&str>) -> Result<Arc<[Article]>, NewsError> {
        if let Some(articles) = self.fresh_articles().await {
            debug!(count = articles.len(), "serving cached news");
            return Ok(articles);
        }

        let _gate = self.fetch_gate.lock().await;
        // Whoever held the gate before us may have just refreshed the slot.
        if let Some(articles) = self.fresh_articles().await {
            debug!(count = articles.len(), "serving news refreshed by concurrent caller");
            return Ok(articles);
        }

        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(NewsError::MissingApiKey)?;

        match self.provider.latest(api_key).await {
            Ok(articles) => {
                let entry = CachedNews {
                    articles: articles.into(),
                    fetched_at: self.clock.now(),
                };
                let articles = Arc::clone(&entry.articles);
                *self.entry.write().await = Some(entry);
                self.invalidated.store(false, Ordering::SeqCst);
                info!(count = articles.len(), "news cache refreshed");
                Ok(articles)
            }
            Err(err) => {
                warn!(error = %err, "news refresh failed, cache left untouched");
                Err(err.into())
            }
        }
    }

    /// Marks the current slot stale without dropping it.
    pub fn invalidate(&self) {
        self.invalidated.store(true, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> Option<CachedNews> {
        self.entry.read().await.clone()
    }

    pub async fn cached_age(&self) -> Option<chrono::Duration> {
        let fetched_at = self.entry.read().await.as_ref()?.fetched_at;
        let age = self.clock.now() - fetched_at;
        Some(age.max(chrono::Duration::zero()))
    }

    /// Whole minutes since the last successful refresh, `-1` if there never was one.
    pub async fn cached_age_minutes(&self) -> i64 {
        self.cached_age()
            .await
            .map(|age| age.num_minutes())
            .unwrap_or(-1)
    }

    async fn fresh_articles(&self) -> Option<Arc<[Article]>> {
        if self.invalidated.load(Ordering::SeqCst) {
            return None;
        }
        let guard = self.entry.read().await;
        let entry = guard.as_ref()?;
        let age = (self.clock.now() - entry.fetched_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        (age < self.freshness).then(|| Arc::clone(&entry.articles))
    }
}
