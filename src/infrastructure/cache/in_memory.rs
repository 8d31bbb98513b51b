//! In-memory cache implementation using moka

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::sync::Cache as MokaCache;

use super::clock::{Clock, SystemClock};
use crate::domain::cache::{BlockingCache, Cache, GlobPattern};
use crate::domain::DomainError;

/// Configuration for in-memory cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryCacheConfig {
    /// Maximum number of entries; beyond it moka evicts early. Expiry
    /// otherwise follows each entry's own TTL.
    pub max_capacity: u64,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
        }
    }
}

impl InMemoryCacheConfig {
    /// Sets the maximum number of entries
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }
}

/// Cache entry stored in moka
#[derive(Debug, Clone)]
struct CacheEntry {
    /// Serialized JSON value
    data: String,
    /// Absolute expiry, `None` for entries that never expire
    expires_at: Option<DateTime<Utc>>,
}

/// Thread-safe in-process store
///
/// Expiry is tracked per entry against an injectable [`Clock`], so tests can
/// move time forward instead of sleeping. Both calling conventions share the
/// same entries; moka's sync cache never blocks for long, so the async view
/// calls straight into it.
#[derive(Debug)]
pub struct InMemoryCache {
    cache: MokaCache<String, CacheEntry>,
    clock: Arc<dyn Clock>,
    config: InMemoryCacheConfig,
}

impl InMemoryCache {
    /// Creates a new in-memory cache with default configuration
    pub fn new() -> Self {
        Self::with_config(InMemoryCacheConfig::default())
    }

    /// Creates a new in-memory cache with the given configuration
    pub fn with_config(config: InMemoryCacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a cache that reads time from `clock`
    pub fn with_clock(config: InMemoryCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: MokaCache::builder().max_capacity(config.max_capacity).build(),
            clock,
            config,
        }
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        entry
            .expires_at
            .is_some_and(|expires_at| self.clock.now() >= expires_at)
    }

    fn live_entry(&self, key: &str) -> Option<CacheEntry> {
        let entry = self.cache.get(key)?;

        if self.is_expired(&entry) {
            self.cache.invalidate(key);
            return None;
        }

        Some(entry)
    }

    fn expiry_for(&self, ttl: Option<Duration>) -> Option<DateTime<Utc>> {
        ttl.map(|ttl| {
            let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
            self.clock
                .now()
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        })
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockingCache for InMemoryCache {
    fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.live_entry(key).map(|entry| entry.data))
    }

    fn set_raw(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), DomainError> {
        let entry = CacheEntry {
            data: value.to_string(),
            expires_at: self.expiry_for(ttl),
        };

        self.cache.insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.cache.remove(key).is_some_and(|entry| !self.is_expired(&entry)))
    }

    fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.live_entry(key).is_some())
    }

    fn search_keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        let glob = GlobPattern::new(pattern)?;

        let mut keys: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, entry)| glob.is_match(key) && !self.is_expired(entry))
            .map(|(key, _)| key.to_string())
            .collect();

        keys.sort();
        Ok(keys)
    }

    fn info(&self) -> Result<BTreeMap<String, String>, DomainError> {
        self.cache.run_pending_tasks();

        let mut info = BTreeMap::new();
        info.insert("backend".to_string(), "in_memory".to_string());
        info.insert("entries".to_string(), self.cache.entry_count().to_string());
        info.insert(
            "max_capacity".to_string(),
            self.config.max_capacity.to_string(),
        );
        Ok(info)
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        BlockingCache::get_raw(self, key)
    }

    async fn set_raw(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), DomainError> {
        BlockingCache::set_raw(self, key, value, ttl)
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        BlockingCache::delete(self, key)
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        BlockingCache::exists(self, key)
    }

    async fn search_keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        BlockingCache::search_keys(self, pattern)
    }

    async fn info(&self) -> Result<BTreeMap<String, String>, DomainError> {
        BlockingCache::info(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{BlockingCacheExt, CacheExt};
    use crate::infrastructure::cache::clock::ManualClock;

    fn cache_with_clock() -> (InMemoryCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = InMemoryCache::with_clock(InMemoryCacheConfig::default(), clock.clone());
        (cache, clock)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = InMemoryCache::new();

        CacheExt::set(&cache, "key1", &"value1", Some(Duration::from_secs(60)))
            .await
            .unwrap();

        let result: Option<String> = CacheExt::get(&cache, "key1").await.unwrap();
        assert_eq!(result, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let cache = InMemoryCache::new();

        let result: Option<String> = CacheExt::get(&cache, "missing").await.unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_blocking_and_async_views_share_entries() {
        let cache = InMemoryCache::new();
        BlockingCacheExt::set(&cache, "k", &42u32, None).unwrap();

        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let value: Option<u32> = rt.block_on(CacheExt::get(&cache, "k")).unwrap();
        assert_eq!(value, Some(42));
    }

    #[test]
    fn test_delete() {
        let cache = InMemoryCache::new();
        BlockingCacheExt::set(&cache, "key1", &"value1", None).unwrap();

        assert!(BlockingCache::delete(&cache, "key1").unwrap());
        assert!(!BlockingCache::delete(&cache, "key1").unwrap());
        assert!(!BlockingCache::exists(&cache, "key1").unwrap());
    }

    #[test]
    fn test_entry_expires_when_ttl_elapses() {
        let (cache, clock) = cache_with_clock();
        BlockingCacheExt::set(&cache, "k", &"v", Some(Duration::from_secs(30 * 60))).unwrap();

        clock.advance(Duration::from_secs(29 * 60));
        assert!(BlockingCache::exists(&cache, "k").unwrap());

        clock.advance(Duration::from_secs(60));
        assert!(!BlockingCache::exists(&cache, "k").unwrap());
        assert!(BlockingCache::get_raw(&cache, "k").unwrap().is_none());
    }

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let (cache, clock) = cache_with_clock();
        BlockingCacheExt::set(&cache, "k", &"v", None).unwrap();

        clock.advance(Duration::from_secs(365 * 24 * 3600));
        assert!(BlockingCache::exists(&cache, "k").unwrap());
    }

    #[test]
    fn test_delete_of_expired_entry_reports_missing() {
        let (cache, clock) = cache_with_clock();
        BlockingCacheExt::set(&cache, "k", &"v", Some(Duration::from_secs(1))).unwrap();

        clock.advance(Duration::from_secs(2));
        assert!(!BlockingCache::delete(&cache, "k").unwrap());
    }

    #[test]
    fn test_search_keys_skips_expired() {
        let (cache, clock) = cache_with_clock();
        BlockingCacheExt::set(&cache, "user:1", &1, Some(Duration::from_secs(10))).unwrap();
        BlockingCacheExt::set(&cache, "user:2", &2, Some(Duration::from_secs(100))).unwrap();
        BlockingCacheExt::set(&cache, "other", &3, None).unwrap();

        clock.advance(Duration::from_secs(20));

        let keys = BlockingCache::search_keys(&cache, "user:*").unwrap();
        assert_eq!(keys, vec!["user:2"]);
    }

    #[test]
    fn test_search_keys_invalid_pattern_is_not_fatal() {
        let cache = InMemoryCache::new();
        BlockingCacheExt::set(&cache, "a[", &1, None).unwrap();

        let keys = BlockingCache::search_keys(&cache, "a[").unwrap();
        assert_eq!(keys, vec!["a["]);
    }

    #[test]
    fn test_info_reports_entries() {
        let cache = InMemoryCache::with_config(InMemoryCacheConfig::default().with_max_capacity(50));
        BlockingCacheExt::set(&cache, "a", &1, None).unwrap();

        let info = BlockingCache::info(&cache).unwrap();
        assert_eq!(info.get("backend").map(String::as_str), Some("in_memory"));
        assert_eq!(info.get("entries").map(String::as_str), Some("1"));
        assert_eq!(info.get("max_capacity").map(String::as_str), Some("50"));
    }
}
