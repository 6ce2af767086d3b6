//! Feed download with bounded retries and a fallback source.
//!
//! Every attempt is fetch -> parse -> validate; any failure counts as a
//! failed attempt. The primary source gets `max_retries` attempts with a
//! backoff sleep between attempts (never after the last one), then the
//! fallback source gets `fallback_attempts` attempts on the same schedule.

use std::future::Future;
use std::time::Duration;

use crate::app::{BonusError, Result};
use crate::domain::FeedDocument;
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;

pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_FALLBACK_ATTEMPTS: u32 = 2;
pub const DEFAULT_DELAYS_MS: [u64; 5] = [100, 500, 1000, 2000, 4000];

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts against the primary source.
    pub max_retries: u32,
    /// Sleep before attempt `n + 1`; the last entry repeats when exhausted.
    pub delays: Vec<Duration>,
    pub fallback_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delays: DEFAULT_DELAYS_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            fallback_attempts: DEFAULT_FALLBACK_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps, for callers that want a quick answer.
    pub fn immediate(max_retries: u32, fallback_attempts: u32) -> Self {
        Self {
            max_retries,
            delays: Vec::new(),
            fallback_attempts,
        }
    }

    pub fn delay_for(&self, attempt: usize) -> Duration {
        self.delays
            .get(attempt)
            .or_else(|| self.delays.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedSources {
    pub primary_url: String,
    pub fallback_url: Option<String>,
}

/// Run `operation` up to `attempts` times, sleeping per `policy` in between.
///
/// Returns the first success or the last error.
async fn retry_with_backoff<T, F, Fut>(
    attempts: u32,
    policy: &RetryPolicy,
    url: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        attempt += 1;
        if attempt >= attempts {
            return Err(err);
        }

        let delay = policy.delay_for(attempt as usize - 1);
        tracing::warn!(
            url,
            attempt,
            attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Feed fetch failed, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
    }
}

async fn fetch_and_validate(
    fetcher: &(dyn Fetcher + Send + Sync),
    normalizer: &Normalizer,
    url: &str,
) -> Result<FeedDocument> {
    let body = fetcher.fetch(url).await?;
    normalizer.normalize(&body)
}

/// Download the feed, reporting why it could not be loaded.
pub async fn try_fetch_feed(
    fetcher: &(dyn Fetcher + Send + Sync),
    normalizer: &Normalizer,
    sources: &FeedSources,
    policy: &RetryPolicy,
) -> Result<FeedDocument> {
    if !fetcher.is_online() {
        return Err(BonusError::Offline);
    }

    let primary = &sources.primary_url;
    match retry_with_backoff(policy.max_retries, policy, primary, move || {
        fetch_and_validate(fetcher, normalizer, primary)
    })
    .await
    {
        Ok(doc) => {
            tracing::info!(url = %primary, merchants = doc.merchants.len(), "Fetched feed");
            return Ok(doc);
        }
        Err(e) => {
            tracing::warn!(url = %primary, error = %e, "Primary feed source exhausted");
        }
    }

    let Some(fallback) = sources.fallback_url.as_deref() else {
        return Err(BonusError::FeedUnavailable);
    };

    match retry_with_backoff(policy.fallback_attempts, policy, fallback, move || {
        fetch_and_validate(fetcher, normalizer, fallback)
    })
    .await
    {
        Ok(doc) => {
            tracing::info!(
                url = %fallback,
                merchants = doc.merchants.len(),
                "Fetched feed from fallback"
            );
            Ok(doc)
        }
        Err(e) => {
            tracing::warn!(url = %fallback, error = %e, "Fallback feed source exhausted");
            Err(BonusError::FeedUnavailable)
        }
    }
}

/// Download the feed; `None` once every source is exhausted. Never fails.
pub async fn fetch_feed(
    fetcher: &(dyn Fetcher + Send + Sync),
    normalizer: &Normalizer,
    sources: &FeedSources,
    policy: &RetryPolicy,
) -> Option<FeedDocument> {
    match try_fetch_feed(fetcher, normalizer, sources, policy).await {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::debug!(error = %e, "No feed available");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::time::Instant;

    pub const VALID_FEED: &str = r#"{"merchants": {"www.example.no": {"name": "Example", "urlName": "example", "cashbackDescription": "5%"}}}"#;

    /// Replays a fixed script of bodies (or failures) per URL.
    #[derive(Default)]
    pub struct ScriptedFetcher {
        script: Mutex<HashMap<String, VecDeque<Option<String>>>>,
        pub calls: Mutex<Vec<(String, Instant)>>,
        pub offline: bool,
    }

    impl ScriptedFetcher {
        pub fn respond(self, url: &str, outcomes: &[Option<&str>]) -> Self {
            self.script.lock().unwrap().insert(
                url.to_string(),
                outcomes.iter().map(|o| o.map(String::from)).collect(),
            );
            self
        }

        pub fn call_count(&self, url: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|(u, _)| u == url).count()
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), Instant::now()));
            let next = self
                .script
                .lock()
                .unwrap()
                .get_mut(url)
                .and_then(|queue| queue.pop_front());
            match next {
                Some(Some(body)) => Ok(body.into_bytes()),
                _ => Err(BonusError::HttpStatus {
                    status: 503,
                    url: url.to_string(),
                }),
            }
        }

        async fn check_url_blocked(&self, _url: &str) -> bool {
            false
        }

        fn is_online(&self) -> bool {
            !self.offline
        }
    }

    fn sources() -> FeedSources {
        FeedSources {
            primary_url: "https://primary.test/feed.json".into(),
            fallback_url: Some("https://fallback.test/feed.json".into()),
        }
    }

    #[test]
    fn test_delay_schedule_repeats_last() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(4), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(9), Duration::from_millis(4000));
        assert_eq!(RetryPolicy::immediate(3, 1).delay_for(0), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_success_first_try() {
        let fetcher =
            ScriptedFetcher::default().respond(&sources().primary_url, &[Some(VALID_FEED)]);
        let policy = RetryPolicy::default();
        let doc = fetch_feed(&fetcher, &Normalizer::new(), &sources(), &policy).await;

        assert!(doc.is_some());
        assert_eq!(fetcher.call_count(&sources().primary_url), 1);
        assert_eq!(fetcher.call_count("https://fallback.test/feed.json"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_recovers_after_failures() {
        let fetcher = ScriptedFetcher::default()
            .respond(&sources().primary_url, &[None, Some("not json"), Some(VALID_FEED)]);
        let start = Instant::now();
        let policy = RetryPolicy::default();
        let doc = fetch_feed(&fetcher, &Normalizer::new(), &sources(), &policy).await;

        assert!(doc.is_some());
        assert_eq!(fetcher.call_count(&sources().primary_url), 3);
        assert!(start.elapsed() >= Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_after_primary_exhausted() {
        let src = sources();
        let fetcher = ScriptedFetcher::default()
            .respond(&src.primary_url, &[None, None, None, None, None])
            .respond(src.fallback_url.as_deref().unwrap(), &[Some(VALID_FEED)]);
        let start = Instant::now();

        let doc = fetch_feed(&fetcher, &Normalizer::new(), &src, &RetryPolicy::default())
            .await
            .unwrap();

        assert!(doc.merchants.contains_key("www.example.no"));
        assert_eq!(fetcher.call_count(&src.primary_url), 5);
        assert_eq!(fetcher.call_count(src.fallback_url.as_deref().unwrap()), 1);

        let calls = fetcher.calls.lock().unwrap();
        let fallback_at = calls.last().unwrap().1;
        assert!(fallback_at - start >= Duration::from_millis(100 + 500 + 1000 + 2000));
        assert!(fallback_at - start < Duration::from_millis(100 + 500 + 1000 + 2000 + 4000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_shape_is_a_failed_attempt() {
        let src = sources();
        let fetcher = ScriptedFetcher::default()
            .respond(&src.primary_url, &[Some(r#"{"merchants": null}"#); 5])
            .respond(src.fallback_url.as_deref().unwrap(), &[Some("[]"), Some(r#"{"other": 1}"#)]);

        let policy = RetryPolicy::default();
        let result = try_fetch_feed(&fetcher, &Normalizer::new(), &src, &policy).await;

        assert!(matches!(result, Err(BonusError::FeedUnavailable)));
        assert_eq!(fetcher.call_count(&src.primary_url), 5);
        assert_eq!(fetcher.call_count(src.fallback_url.as_deref().unwrap()), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_fallback_configured() {
        let src = FeedSources {
            primary_url: "https://primary.test/feed.json".into(),
            fallback_url: None,
        };
        let fetcher = ScriptedFetcher::default();
        let policy = RetryPolicy::immediate(2, 2);
        let result = try_fetch_feed(&fetcher, &Normalizer::new(), &src, &policy).await;

        assert!(matches!(result, Err(BonusError::FeedUnavailable)));
        assert_eq!(fetcher.call_count(&src.primary_url), 2);
    }

    #[tokio::test]
    async fn test_offline_skips_network() {
        let fetcher = ScriptedFetcher {
            offline: true,
            ..Default::default()
        };
        let policy = RetryPolicy::default();
        let result = try_fetch_feed(&fetcher, &Normalizer::new(), &sources(), &policy).await;

        assert!(matches!(result, Err(BonusError::Offline)));
        assert!(fetcher.calls.lock().unwrap().is_empty());
    }
}
