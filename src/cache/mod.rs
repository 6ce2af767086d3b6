//! Persistent feed cache and user settings on top of a [`Storage`] backend.
//!
//! The feed document, its fetch time and the derived host index are written
//! together and expire together: once `feedTime` is older than the TTL none of
//! them is served.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::app::Result;
use crate::domain::{strip_www, with_www, DomainAliases, FeedDocument, ServiceRegistry};
use crate::normalizer::Normalizer;
use crate::store::{Storage, StorageExt};

/// Bump the version suffix to orphan caches written in an older format.
pub const CACHE_PREFIX: &str = "bv_v5_";
pub const FEED_DATA_KEY: &str = "bv_v5_feedData";
pub const FEED_TIME_KEY: &str = "bv_v5_feedTime";
pub const HOST_INDEX_KEY: &str = "bv_v5_hostIndex";

pub const ENABLED_SERVICES_KEY: &str = "bv_enabledServices";
pub const HIDDEN_SITES_KEY: &str = "bv_hiddenSites";

pub const DEFAULT_TTL_HOURS: i64 = 48;

pub struct FeedCache<S: Storage> {
    storage: Arc<S>,
    ttl: Duration,
    normalizer: Normalizer,
}

impl<S: Storage> FeedCache<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self::with_ttl(storage, Duration::hours(DEFAULT_TTL_HOURS))
    }

    pub fn with_ttl(storage: Arc<S>, ttl: Duration) -> Self {
        Self {
            storage,
            ttl,
            normalizer: Normalizer::new(),
        }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// A `feedTime` in the future, or one too far off to subtract, is stale.
    fn is_fresh_at(&self, now: DateTime<Utc>) -> Result<bool> {
        let Some(feed_time) = self.storage.get_json::<i64>(FEED_TIME_KEY)? else {
            return Ok(false);
        };
        Ok(match now.timestamp_millis().checked_sub(feed_time) {
            Some(age) => (0..self.ttl.num_milliseconds()).contains(&age),
            None => {
                tracing::warn!(feed_time, "Ignoring out-of-range cached feed time");
                false
            }
        })
    }

    /// Cached feed as of `now`; `Ok(None)` when absent, stale or invalid.
    pub fn try_get_cached_feed_at(&self, now: DateTime<Utc>) -> Result<Option<FeedDocument>> {
        if !self.is_fresh_at(now)? {
            tracing::debug!("Feed cache empty or expired");
            return Ok(None);
        }

        let Some(raw) = self.storage.get(FEED_DATA_KEY)? else {
            return Ok(None);
        };

        match self.normalizer.normalize(raw.as_bytes()) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring invalid cached feed");
                Ok(None)
            }
        }
    }

    pub fn get_cached_feed_at(&self, now: DateTime<Utc>) -> Option<FeedDocument> {
        self.try_get_cached_feed_at(now).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Feed cache read failed");
            None
        })
    }

    pub fn get_cached_feed(&self) -> Option<FeedDocument> {
        self.get_cached_feed_at(Utc::now())
    }

    /// Persist feed, fetch time and host index in one batch.
    ///
    /// The host index is the last entry so a backend without real batching
    /// never exposes a host index newer than its feed.
    pub fn try_cache_feed_at(&self, doc: &FeedDocument, now: DateTime<Utc>) -> Result<()> {
        let entries = [
            (FEED_DATA_KEY, serde_json::to_string(doc)?),
            (FEED_TIME_KEY, now.timestamp_millis().to_string()),
            (HOST_INDEX_KEY, serde_json::to_string(&doc.host_index())?),
        ];
        self.storage.set_many(&entries)?;
        tracing::info!(hosts = doc.merchants.len(), "Cached feed");
        Ok(())
    }

    pub fn cache_feed_at(&self, doc: &FeedDocument, now: DateTime<Utc>) {
        if let Err(e) = self.try_cache_feed_at(doc, now) {
            tracing::warn!(error = %e, "Could not cache feed, continuing without cache");
        }
    }

    pub fn cache_feed(&self, doc: &FeedDocument) {
        self.cache_feed_at(doc, Utc::now());
    }

    pub fn try_clear(&self) -> Result<()> {
        self.storage
            .remove(&[FEED_DATA_KEY, FEED_TIME_KEY, HOST_INDEX_KEY])
    }

    pub fn clear(&self) {
        if let Err(e) = self.try_clear() {
            tracing::warn!(error = %e, "Could not clear feed cache");
        }
    }

    /// Quick membership test against the cached host index only.
    ///
    /// `Some(false)` is authoritative: the host is not a merchant and the full
    /// feed need not be loaded. `None` means no usable index is cached.
    pub fn try_is_known_merchant_host_at(
        &self,
        hostname: &str,
        aliases: &DomainAliases,
        now: DateTime<Utc>,
    ) -> Result<Option<bool>> {
        if !self.is_fresh_at(now)? {
            return Ok(None);
        }
        let Some(index) = self.storage.get_json::<HashSet<String>>(HOST_INDEX_KEY)? else {
            return Ok(None);
        };

        let mut candidates = vec![
            hostname.to_string(),
            strip_www(hostname).to_string(),
            with_www(hostname),
        ];
        if let Some(alias) = aliases.resolve(hostname) {
            candidates.push(alias.to_string());
            candidates.push(strip_www(alias).to_string());
        }

        Ok(Some(candidates.iter().any(|c| index.contains(c))))
    }

    pub fn is_known_merchant_host_at(
        &self,
        hostname: &str,
        aliases: &DomainAliases,
        now: DateTime<Utc>,
    ) -> Option<bool> {
        self.try_is_known_merchant_host_at(hostname, aliases, now)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Host index read failed");
                None
            })
    }

    pub fn is_known_merchant_host(&self, hostname: &str, aliases: &DomainAliases) -> Option<bool> {
        self.is_known_merchant_host_at(hostname, aliases, Utc::now())
    }

    /// Services the user has enabled, or the registry defaults if never chosen.
    pub fn enabled_services(&self, registry: &ServiceRegistry) -> HashSet<String> {
        self.storage
            .get_or::<Option<HashSet<String>>>(ENABLED_SERVICES_KEY, None)
            .unwrap_or_else(|| registry.default_enabled_ids())
    }

    pub fn set_service_enabled(
        &self,
        registry: &ServiceRegistry,
        service_id: &str,
        enabled: bool,
    ) -> Result<()> {
        let mut ids: BTreeSet<String> = self.enabled_services(registry).into_iter().collect();
        if enabled {
            ids.insert(service_id.to_string());
        } else {
            ids.remove(service_id);
        }
        self.storage.set_json(ENABLED_SERVICES_KEY, &ids)
    }

    pub fn hidden_sites(&self) -> BTreeSet<String> {
        self.storage.get_or(HIDDEN_SITES_KEY, BTreeSet::new())
    }

    pub fn is_site_hidden(&self, hostname: &str) -> bool {
        let hidden = self.hidden_sites();
        hidden.contains(hostname) || hidden.contains(strip_www(hostname))
    }

    pub fn hide_site(&self, hostname: &str) -> Result<()> {
        let mut hidden = self.hidden_sites();
        hidden.insert(strip_www(hostname).to_string());
        self.storage.set_json(HIDDEN_SITES_KEY, &hidden)
    }

    pub fn unhide_site(&self, hostname: &str) -> Result<bool> {
        let mut hidden = self.hidden_sites();
        let removed = hidden.remove(hostname) | hidden.remove(strip_www(hostname));
        self.storage.set_json(HIDDEN_SITES_KEY, &hidden)?;
        Ok(removed)
    }
}
