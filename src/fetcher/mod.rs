pub mod http_fetcher;
pub mod retry;

use async_trait::async_trait;

use crate::app::Result;

pub use retry::{fetch_feed, try_fetch_feed, FeedSources, RetryPolicy};

#[async_trait]
pub trait Fetcher {
    /// One network attempt: the raw response body, or the failure.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;

    /// Whether a request to `url` is prevented from reaching the network,
    /// e.g. by a content blocker.
    async fn check_url_blocked(&self, url: &str) -> bool;

    fn is_online(&self) -> bool {
        true
    }
}
