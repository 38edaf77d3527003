use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use markdock_core::{Clock, CurrentsClient, NewsCache, NewsConfig, NewsError, ProviderError};
use reqwest::Client;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "test-key";

#[derive(Debug)]
struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl ManualClock {
    fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(start),
        }
    }

    fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += chrono::Duration::from_std(by).unwrap();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

fn sample_news() -> serde_json::Value {
    serde_json::json!({
        "status": "ok",
        "news": [
            {
                "id": "1",
                "title": "Stocks climb on earnings",
                "description": "Tech leads the way.",
                "url": "https://example.com/1",
                "author": "Reuters",
                "image": "https://example.com/1.png",
                "language": "en",
                "category": ["business", "finance"],
                "published": "2024-10-21 07:28:00 +0000"
            },
            {
                "id": "2",
                "title": "Oil slips",
                "description": "",
                "url": "https://example.com/2",
                "author": "",
                "image": "None",
                "language": "en",
                "category": ["business"],
                "published": "2024-10-21 08:00:00 +0000"
            }
        ],
        "page": 1
    })
}

fn ok_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(sample_news())
}

fn cache_for(server: &MockServer, clock: Arc<ManualClock>) -> NewsCache {
    let config = NewsConfig {
        endpoint: format!("{}/v1/latest-news", server.uri()),
        request_timeout_seconds: 1,
        ..NewsConfig::default()
    };
    let provider = CurrentsClient::new(Client::new(), &config);
    NewsCache::new(provider, config.freshness()).with_clock(clock)
}

fn start_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 10, 21, 9, 0, 0).unwrap(),
    ))
}

async fn provider_calls(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}

#[tokio::test]
async fn fetches_within_window_reach_provider_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/latest-news"))
        .and(query_param("apiKey", KEY))
        .and(query_param("category", "business"))
        .respond_with(ok_response())
        .mount(&server)
        .await;

    let clock = start_clock();
    let cache = cache_for(&server, clock.clone());

    let first = cache.fetch(Some(KEY)).await.expect("first fetch");
    assert_eq!(first.len(), 2);

    for _ in 0..5 {
        clock.advance(Duration::from_secs(10 * 60));
        let again = cache.fetch(Some(KEY)).await.expect("cached fetch");
        assert!(Arc::ptr_eq(&first, &again));
    }

    assert_eq!(provider_calls(&server).await, 1);
}

#[tokio::test]
async fn expired_window_triggers_exactly_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ok_response())
        .mount(&server)
        .await;

    let clock = start_clock();
    let cache = cache_for(&server, clock.clone());

    cache.fetch(Some(KEY)).await.expect("initial fetch");
    clock.advance(Duration::from_secs(60 * 60));
    cache.fetch(Some(KEY)).await.expect("refresh");
    cache.fetch(Some(KEY)).await.expect("served from refreshed cache");

    assert_eq!(provider_calls(&server).await, 2);
}

#[tokio::test]
async fn cached_age_reports_minutes_since_last_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ok_response())
        .mount(&server)
        .await;

    let clock = start_clock();
    let cache = cache_for(&server, clock.clone());
    assert_eq!(cache.cached_age_minutes().await, -1);

    cache.fetch(Some(KEY)).await.expect("fetch");
    assert_eq!(cache.cached_age_minutes().await, 0);

    clock.advance(Duration::from_secs(5 * 60 + 59));
    assert_eq!(cache.cached_age_minutes().await, 5);
    clock.advance(Duration::from_secs(3 * 60));
    assert_eq!(cache.cached_age_minutes().await, 8);

    clock.advance(Duration::from_secs(60 * 60));
    cache.fetch(Some(KEY)).await.expect("refresh");
    assert_eq!(cache.cached_age_minutes().await, 0);
}

#[tokio::test]
async fn timeout_leaves_previous_entry_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ok_response())
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ok_response().set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let clock = start_clock();
    let cache = cache_for(&server, clock.clone());

    cache.fetch(Some(KEY)).await.expect("initial fetch");
    let before = cache.snapshot().await.expect("populated");

    clock.advance(Duration::from_secs(61 * 60));
    let err = cache.fetch(Some(KEY)).await.unwrap_err();
    assert!(matches!(
        err,
        NewsError::Provider(ProviderError::Timeout(_))
    ));

    let after = cache.snapshot().await.expect("still populated");
    assert_eq!(after.fetched_at, before.fetched_at);
    assert!(Arc::ptr_eq(&after.articles, &before.articles));
    assert_eq!(cache.cached_age_minutes().await, 61);
}

#[tokio::test]
async fn stale_entry_is_not_served_when_refresh_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ok_response())
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let clock = start_clock();
    let cache = cache_for(&server, clock.clone());
    cache.fetch(Some(KEY)).await.expect("initial fetch");

    clock.advance(Duration::from_secs(90 * 60));
    let err = cache.fetch(Some(KEY)).await.unwrap_err();
    assert!(matches!(err, NewsError::Provider(ProviderError::Status(503))));
    assert_eq!(cache.snapshot().await.map(|s| s.articles.len()), Some(2));
}

#[tokio::test]
async fn concurrent_callers_share_one_provider_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ok_response().set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;

    let cache = Arc::new(cache_for(&server, start_clock()));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move { cache.fetch(Some(KEY)).await }));
    }

    for handle in handles {
        let articles = handle.await.expect("task").expect("fetch");
        assert_eq!(articles.len(), 2);
    }
    assert_eq!(provider_calls(&server).await, 1);
}

#[tokio::test]
async fn missing_key_is_a_configuration_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ok_response())
        .mount(&server)
        .await;

    let cache = cache_for(&server, start_clock());
    assert!(matches!(
        cache.fetch(None).await,
        Err(NewsError::MissingApiKey)
    ));
    assert!(matches!(
        cache.fetch(Some("   ")).await,
        Err(NewsError::MissingApiKey)
    ));
    assert_eq!(provider_calls(&server).await, 0);
    assert_eq!(cache.cached_age_minutes().await, -1);
}

#[tokio::test]
async fn fresh_entry_is_served_without_a_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ok_response())
        .mount(&server)
        .await;

    let cache = cache_for(&server, start_clock());
    cache.fetch(Some(KEY)).await.expect("initial fetch");
    let cached = cache.fetch(None).await.expect("served from cache");
    assert_eq!(cached.len(), 2);
}

#[tokio::test]
async fn invalidate_forces_next_fetch_to_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ok_response())
        .mount(&server)
        .await;

    let cache = cache_for(&server, start_clock());
    cache.fetch(Some(KEY)).await.expect("initial fetch");
    cache.invalidate();
    assert!(cache.snapshot().await.is_some());
    cache.fetch(Some(KEY)).await.expect("forced refresh");
    cache.fetch(Some(KEY)).await.expect("cached again");

    assert_eq!(provider_calls(&server).await, 2);
}
