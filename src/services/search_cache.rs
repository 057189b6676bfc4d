use crate::clients::MarketplaceSearch;
use crate::db::Store;
use crate::services::fingerprint::SearchFingerprint;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Key-value store with per-entry expiry.
#[async_trait::async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Missing and expired keys both return `Ok(None)`.
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()>;

    async fn purge_expired(&self) -> anyhow::Result<u64>;
}

/// `search_cache` table backed implementation.
pub struct StoreCache {
    store: Store,
}

impl StoreCache {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl KeyValueCache for StoreCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.store.cache_repo().get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()> {
        self.store.cache_repo().set(key, value, ttl).await
    }

    async fn purge_expired(&self) -> anyhow::Result<u64> {
        self.store.cache_repo().purge_expired().await
    }
}

/// TTL-bounded cache of upstream search pages keyed by fingerprint and offset.
///
/// Cache failures never reach the caller: reads degrade to a miss and
/// writes are dropped with a warning.
pub struct SearchResultCache {
    backend: Arc<dyn KeyValueCache>,
    ttl: Duration,
}

impl SearchResultCache {
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueCache>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    #[must_use]
    pub fn cache_key(fingerprint: &SearchFingerprint, offset: u64) -> String {
        format!("search:{fingerprint}:{offset}")
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(
        &self,
        fingerprint: &SearchFingerprint,
        offset: u64,
    ) -> Option<MarketplaceSearch> {
        let key = Self::cache_key(fingerprint, offset);

        let raw = match self.backend.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                metrics::counter!("search_cache_misses_total").increment(1);
                return None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Search cache read failed, treating as miss");
                metrics::counter!("search_cache_misses_total").increment(1);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(result) => {
                debug!(key = %key, "Search cache hit");
                metrics::counter!("search_cache_hits_total").increment(1);
                Some(result)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding unreadable search cache entry");
                metrics::counter!("search_cache_misses_total").increment(1);
                None
            }
        }
    }

    /// Stores a page with the configured TTL. Returns whether it was stored.
    pub async fn put(
        &self,
        fingerprint: &SearchFingerprint,
        offset: u64,
        result: &MarketplaceSearch,
    ) -> bool {
        self.put_with_ttl(fingerprint, offset, result, self.ttl).await
    }

    /// Empty pages and pages carrying upstream errors are never stored.
    pub async fn put_with_ttl(
        &self,
        fingerprint: &SearchFingerprint,
        offset: u64,
        result: &MarketplaceSearch,
        ttl: Duration,
    ) -> bool {
        if !result.is_cacheable() {
            debug!(
                items = result.items.len(),
                errors = result.errors.len(),
                "Not caching empty or failed search result"
            );
            return false;
        }

        let key = Self::cache_key(fingerprint, offset);
        let payload = match serde_json::to_string(result) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode search result for cache");
                return false;
            }
        };

        match self.backend.set(&key, &payload, ttl).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "Search cache write failed");
                false
            }
        }
    }

    pub async fn purge_expired(&self) -> anyhow::Result<u64> {
        self.backend.purge_expired().await
    }
}
