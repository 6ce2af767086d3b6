pub mod offer;

use std::sync::Arc;

use crate::app::Result;
use crate::cache::FeedCache;
use crate::domain::{DomainAliases, FeedDocument, MatchResult, ServiceRegistry};
use crate::fetcher::{try_fetch_feed, FeedSources, Fetcher, RetryPolicy};
use crate::normalizer::Normalizer;
use crate::store::Storage;

pub use offer::{best_offer_for, find_best_offer, find_merchant};

/// Why a hostname did or did not resolve to an offer.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Match(MatchResult),
    /// The user asked never to be notified on this site.
    Hidden,
    /// The cached host index rules the host out; no feed was loaded.
    NotAMerchant,
    /// The feed was loaded and has no merchant for the host.
    NoMerchant,
    /// A merchant exists but none of the enabled services cover it.
    NoEnabledOffer,
}

impl Resolution {
    pub fn into_match(self) -> Option<MatchResult> {
        match self {
            Resolution::Match(m) => Some(m),
            _ => None,
        }
    }
}

/// Resolves visited hostnames to their best cashback offer.
///
/// Owns all state it needs; separate instances never share caches.
pub struct Resolver<S: Storage> {
    cache: FeedCache<S>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    normalizer: Normalizer,
    sources: FeedSources,
    policy: RetryPolicy,
    aliases: DomainAliases,
}

impl<S: Storage> Resolver<S> {
    pub fn new(
        cache: FeedCache<S>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        sources: FeedSources,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            cache,
            fetcher,
            normalizer: Normalizer::new(),
            sources,
            policy,
            aliases: DomainAliases::builtin(),
        }
    }

    pub fn with_aliases(mut self, aliases: DomainAliases) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn cache(&self) -> &FeedCache<S> {
        &self.cache
    }

    pub fn aliases(&self) -> &DomainAliases {
        &self.aliases
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher + Send + Sync> {
        &self.fetcher
    }

    /// Fresh cached feed, or a network fetch that is then cached.
    pub async fn load_feed(&self) -> Result<FeedDocument> {
        if let Some(doc) = self.cache.get_cached_feed() {
            tracing::debug!("Serving feed from cache");
            return Ok(doc);
        }
        self.refresh().await
    }

    /// Fetch the feed regardless of cache age and store it.
    pub async fn refresh(&self) -> Result<FeedDocument> {
        let doc = try_fetch_feed(
            self.fetcher.as_ref(),
            &self.normalizer,
            &self.sources,
            &self.policy,
        )
        .await?;
        self.cache.cache_feed(&doc);
        Ok(doc)
    }

    /// Registry for the currently available feed, or the built-in one.
    pub async fn services(&self) -> ServiceRegistry {
        match self.load_feed().await {
            Ok(doc) => ServiceRegistry::from_feed(doc.services.as_ref()),
            Err(e) => {
                tracing::debug!(error = %e, "Using built-in services");
                ServiceRegistry::builtin()
            }
        }
    }

    pub async fn resolve_detailed(&self, hostname: &str) -> Result<Resolution> {
        let hostname = normalize_hostname(hostname);

        if self.cache.is_site_hidden(&hostname) {
            return Ok(Resolution::Hidden);
        }

        if self.cache.is_known_merchant_host(&hostname, &self.aliases) == Some(false) {
            tracing::debug!(host = %hostname, "Host not in cached index");
            return Ok(Resolution::NotAMerchant);
        }

        let feed = self.load_feed().await?;
        let Some((host_name, record)) = find_merchant(&feed, &hostname, &self.aliases) else {
            return Ok(Resolution::NoMerchant);
        };

        let registry = ServiceRegistry::from_feed(feed.services.as_ref());
        let enabled = self.cache.enabled_services(&registry);

        Ok(match best_offer_for(host_name, record, &enabled, &registry) {
            Some(m) => {
                tracing::info!(host = %hostname, service = %m.service_id, "Matched offer");
                Resolution::Match(m)
            }
            None => Resolution::NoEnabledOffer,
        })
    }

    /// Best offer for `hostname`, or `None` for any non-match or failure.
    pub async fn resolve(&self, hostname: &str) -> Option<MatchResult> {
        match self.resolve_detailed(hostname).await {
            Ok(resolution) => resolution.into_match(),
            Err(e) => {
                tracing::warn!(host = hostname, error = %e, "Resolution failed");
                None
            }
        }
    }
}

/// Lowercase, trimmed, without the trailing root dot.
pub fn normalize_hostname(hostname: &str) -> String {
    hostname.trim().trim_end_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::BonusError;
    use crate::cache::tests::{sample_feed, ReadOnlyStore};
    use crate::fetcher::retry::tests::ScriptedFetcher;
    use crate::store::MemoryStore;

    const PRIMARY: &str = "https://primary.test/feed.json";
    const FALLBACK: &str = "https://fallback.test/feed.json";
    const TEST_ALIASES: &[(&str, &str)] = &[("shop.example.com", "shop.example.no")];

    fn feed_body() -> String {
        serde_json::to_string(&sample_feed()).unwrap()
    }

    fn resolver_with<S: Storage>(store: S, fetcher: Arc<ScriptedFetcher>) -> Resolver<S> {
        Resolver::new(
            FeedCache::new(Arc::new(store)),
            fetcher,
            FeedSources {
                primary_url: PRIMARY.into(),
                fallback_url: Some(FALLBACK.into()),
            },
            RetryPolicy::immediate(2, 1),
        )
        .with_aliases(DomainAliases::from_static(TEST_ALIASES))
    }

    #[tokio::test]
    async fn test_resolve_fetches_and_caches() {
        let body = feed_body();
        let fetcher = Arc::new(ScriptedFetcher::default().respond(PRIMARY, &[Some(body.as_str())]));
        let resolver = resolver_with(MemoryStore::new(), fetcher.clone());

        let result = resolver.resolve("www.example.no").await.unwrap();
        assert_eq!(result.service_id, "trumf");
        assert!(resolver.cache().get_cached_feed().is_some());

        // Second lookup is served from cache.
        let again = resolver.resolve("example.no").await.unwrap();
        assert_eq!(again.merchant_name, "Example");
        assert_eq!(fetcher.call_count(PRIMARY), 1);
    }

    #[tokio::test]
    async fn test_enabled_services_change_winner() {
        let body = feed_body();
        let fetcher = Arc::new(ScriptedFetcher::default().respond(PRIMARY, &[Some(body.as_str())]));
        let resolver = resolver_with(MemoryStore::new(), fetcher);

        let registry = resolver.services().await;
        resolver
            .cache()
            .set_service_enabled(&registry, "remember", true)
            .unwrap();

        let result = resolver.resolve("www.example.no").await.unwrap();
        assert_eq!(result.service_id, "remember");
        assert_eq!(result.service.color, "#111111");
    }

    #[tokio::test]
    async fn test_host_index_negative_skips_fetch() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let resolver = resolver_with(MemoryStore::new(), fetcher.clone());
        resolver.cache().cache_feed(&sample_feed());

        let resolution = resolver.resolve_detailed("not-a-shop.no").await.unwrap();
        assert_eq!(resolution, Resolution::NotAMerchant);
        assert!(fetcher.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_alias_resolves_through_index_and_feed() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let resolver = resolver_with(MemoryStore::new(), fetcher);
        resolver.cache().cache_feed(&sample_feed());

        let result = resolver.resolve("Shop.Example.com.").await.unwrap();
        assert_eq!(result.merchant_name, "Shop");
    }

    #[tokio::test]
    async fn test_no_enabled_offer() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let resolver = resolver_with(MemoryStore::new(), fetcher);
        resolver.cache().cache_feed(&sample_feed());
        let registry = ServiceRegistry::builtin();
        resolver.cache().set_service_enabled(&registry, "trumf", false).unwrap();

        let resolution = resolver.resolve_detailed("www.example.no").await.unwrap();
        assert_eq!(resolution, Resolution::NoEnabledOffer);
    }

    #[tokio::test]
    async fn test_malformed_offers_do_not_fall_back_to_trumf() {
        let body = r#"{"merchants": {"www.shop.no": {"name": "Shop", "offers": [
            {"serviceId": "remember", "urlName": "shop-rm", "cashbackDescription": null}
        ]}}}"#;
        let fetcher = Arc::new(ScriptedFetcher::default().respond(PRIMARY, &[Some(body)]));
        let resolver = resolver_with(MemoryStore::new(), fetcher);

        let resolution = resolver.resolve_detailed("www.shop.no").await.unwrap();
        assert_eq!(resolution, Resolution::NoEnabledOffer);
    }

    #[tokio::test]
    async fn test_hidden_site_short_circuits() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let resolver = resolver_with(MemoryStore::new(), fetcher.clone());
        resolver.cache().hide_site("example.no").unwrap();

        let resolution = resolver.resolve_detailed("www.example.no").await.unwrap();
        assert_eq!(resolution, Resolution::Hidden);
        assert!(fetcher.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_feed_unavailable_collapses_to_none() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let resolver = resolver_with(MemoryStore::new(), fetcher.clone());

        let err = resolver.resolve_detailed("www.example.no").await.unwrap_err();
        assert!(matches!(err, BonusError::FeedUnavailable));
        assert!(resolver.resolve("www.example.no").await.is_none());
        assert_eq!(fetcher.call_count(FALLBACK), 2);
    }

    #[tokio::test]
    async fn test_storage_failure_still_resolves() {
        let body = feed_body();
        let bodies = [Some(body.as_str()), Some(body.as_str())];
        let fetcher = Arc::new(ScriptedFetcher::default().respond(PRIMARY, &bodies));
        let resolver = resolver_with(ReadOnlyStore::default(), fetcher.clone());

        assert!(resolver.resolve("www.example.no").await.is_some());
        assert!(resolver.resolve("www.example.no").await.is_some());
        assert_eq!(fetcher.call_count(PRIMARY), 2);
    }

    #[test]
    fn test_normalize_hostname() {
        assert_eq!(normalize_hostname(" WWW.Example.NO. "), "www.example.no");
    }
}
