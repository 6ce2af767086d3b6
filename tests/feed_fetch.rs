//! Integration tests for the HTTP fetcher and the retry/fallback loop.
//!
//! Uses `wiremock` to stand up a local HTTP server for each test so no real
//! network traffic is made. Retry policies use zero delays to keep tests fast.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bonusvarsler::app::BonusError;
use bonusvarsler::cache::FeedCache;
use bonusvarsler::domain::DomainAliases;
use bonusvarsler::fetcher::http_fetcher::HttpFetcher;
use bonusvarsler::fetcher::{fetch_feed, try_fetch_feed, FeedSources, Fetcher, RetryPolicy};
use bonusvarsler::normalizer::Normalizer;
use bonusvarsler::resolver::{Resolution, Resolver};
use bonusvarsler::store::SqliteStore;

fn feed_json() -> serde_json::Value {
    json!({
        "services": {
            "remember": {"defaultEnabled": true}
        },
        "merchants": {
            "www.example.no": {
                "hostName": "www.example.no",
                "name": "Example",
                "offers": [
                    {"serviceId": "trumf", "urlName": "example", "cashbackDescription": "5%"},
                    {"serviceId": "remember", "urlName": "example", "cashbackDescription": "Opptil 8%"}
                ]
            },
            "www.legacy.no": {
                "hostName": "www.legacy.no",
                "name": "Legacy",
                "urlName": "legacy",
                "cashbackDescription": "35 kr"
            }
        }
    })
}

fn sources(server: &MockServer) -> FeedSources {
    FeedSources {
        primary_url: format!("{}/primary.json", server.uri()),
        fallback_url: Some(format!("{}/fallback.json", server.uri())),
    }
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

#[tokio::test]
async fn http_fetcher_returns_body_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/primary.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_json()))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let body = fetcher
        .fetch(&format!("{}/primary.json", server.uri()))
        .await
        .unwrap();

    let doc = Normalizer::new().normalize(&body).unwrap();
    assert_eq!(doc.merchants.len(), 2);
}

#[tokio::test]
async fn http_fetcher_reports_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let result = fetcher.fetch(&format!("{}/primary.json", server.uri())).await;

    assert!(
        matches!(result, Err(BonusError::HttpStatus { status: 500, .. })),
        "expected HttpStatus 500, got: {result:?}"
    );
}

#[tokio::test]
async fn check_url_blocked_distinguishes_reachable_and_refused() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    assert!(!fetcher.check_url_blocked(&format!("{}/ads.js", server.uri())).await);
    assert!(fetcher.check_url_blocked("http://127.0.0.1:1/ads.js").await);
}

// ---------------------------------------------------------------------------
// Retry and fallback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_feed_uses_fallback_after_primary_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/primary.json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(5)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fallback.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_json()))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let doc = fetch_feed(
        &fetcher,
        &Normalizer::new(),
        &sources(&server),
        &RetryPolicy::immediate(5, 2),
    )
    .await
    .expect("fallback should provide the feed");

    assert!(doc.merchants.contains_key("www.legacy.no"));
}

#[tokio::test]
async fn fetch_feed_rejects_malformed_documents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/primary.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"merchants": null})))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fallback.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(2)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let result = try_fetch_feed(
        &fetcher,
        &Normalizer::new(),
        &sources(&server),
        &RetryPolicy::immediate(3, 2),
    )
    .await;

    assert!(matches!(result, Err(BonusError::FeedUnavailable)));
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resolver_end_to_end_with_sqlite_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/primary.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_json()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::new(dir.path().join("cache.db")).unwrap());
    let resolver = Resolver::new(
        FeedCache::new(store),
        Arc::new(HttpFetcher::new().unwrap()),
        sources(&server),
        RetryPolicy::immediate(1, 1),
    )
    .with_aliases(DomainAliases::builtin());

    let missing = resolver.resolve("not-listed.example.no").await;
    assert!(missing.is_none());

    // Feed enables re:member by default, so its higher rate wins.
    let best = resolver.resolve("example.no").await.unwrap();
    assert_eq!(best.service_id, "remember");
    assert_eq!(
        best.clickthrough_url.as_deref(),
        Some("https://www.remember.no/reward/rabatt/example")
    );

    let legacy = resolver.resolve("www.legacy.no").await.unwrap();
    assert_eq!(legacy.service_id, "trumf");

    // Served from the host index without another request.
    assert_eq!(
        resolver.resolve_detailed("unknown.no").await.unwrap(),
        Resolution::NotAMerchant
    );
}
