//! Cache manager facade and read-through helper

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, instrument};

use super::clock::{Clock, SystemClock};
use super::lock::{KeyLockRegistry, LockStrategy};
use crate::domain::cache::{
    BlockingCache, BlockingCacheExt, Cache, CacheExt, KeyNamespacer, StoreHandle,
};
use crate::domain::DomainError;

/// TTL applied by the read-through helper when none is given
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Settings of a [`CacheManager`]
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Prefix of every storage key; `None` selects the default prefix
    pub key_prefix: Option<String>,
    /// When off, the read-through helper always computes and never touches the store
    pub enabled: bool,
    /// TTL used by `get_or_compute` and `get_or_compute_async`
    pub default_ttl: Duration,
    /// How cache keys map onto locks
    pub lock_strategy: LockStrategy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            key_prefix: None,
            enabled: true,
            default_ttl: DEFAULT_TTL,
            lock_strategy: LockStrategy::default(),
        }
    }
}

impl CacheSettings {
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_lock_strategy(mut self, strategy: LockStrategy) -> Self {
        self.lock_strategy = strategy;
        self
    }
}

/// Remaining time from `now` until `expires_at`, or `None` if it already passed
fn ttl_until(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<Duration> {
    (expires_at - now)
        .to_std()
        .ok()
        .filter(|ttl| !ttl.is_zero())
}

/// Facade over one backing store
///
/// Every key handed to the manager is a logical key; the manager namespaces it
/// before it reaches the store, and strips the prefix again from search
/// results. Cloning is cheap and clones share the store and the lock registry.
///
/// Absolute expiries are turned into TTLs against the manager's [`Clock`];
/// give it the same clock as the store when that store is driven by one.
#[derive(Debug, Clone)]
pub struct CacheManager {
    cache: Arc<dyn Cache>,
    blocking: Arc<dyn BlockingCache>,
    namespacer: KeyNamespacer,
    locks: Arc<KeyLockRegistry>,
    clock: Arc<dyn Clock>,
    enabled: bool,
    default_ttl: Duration,
}

impl CacheManager {
    /// Creates a manager with its own lock registry
    pub fn new(store: StoreHandle, settings: CacheSettings) -> Self {
        Self {
            cache: store.cache,
            blocking: store.blocking,
            namespacer: KeyNamespacer::new(settings.key_prefix),
            locks: Arc::new(KeyLockRegistry::new(settings.lock_strategy)),
            clock: Arc::new(SystemClock),
            enabled: settings.enabled,
            default_ttl: settings.default_ttl,
        }
    }

    /// Replaces the lock registry, e.g. to share it between managers
    pub fn with_lock_registry(mut self, locks: Arc<KeyLockRegistry>) -> Self {
        self.locks = locks;
        self
    }

    /// Replaces the time source used by `add_until` and token expiry
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to the manager's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn namespacer(&self) -> &KeyNamespacer {
        &self.namespacer
    }

    pub fn lock_registry(&self) -> &Arc<KeyLockRegistry> {
        &self.locks
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn logical_keys(&self, storage_keys: Vec<String>) -> Vec<String> {
        storage_keys
            .iter()
            .filter_map(|key| self.namespacer.logical_key(key))
            .map(str::to_string)
            .collect()
    }

    fn storage_keys<K: AsRef<str>>(&self, keys: &[K]) -> Vec<String> {
        self.namespacer.storage_keys(keys.iter().map(AsRef::as_ref))
    }

    // Blocking operations

    pub fn exists(&self, key: &str) -> Result<bool, DomainError> {
        self.blocking.exists(&self.namespacer.storage_key(key))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DomainError> {
        self.blocking.get(&self.namespacer.storage_key(key))
    }

    /// Stores a value without expiration
    pub fn add<T: Serialize>(&self, key: &str, value: &T) -> Result<bool, DomainError> {
        self.blocking.set(&self.namespacer.storage_key(key), value, None)?;
        Ok(true)
    }

    pub fn add_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<bool, DomainError> {
        self.blocking
            .set(&self.namespacer.storage_key(key), value, Some(ttl))?;
        Ok(true)
    }

    /// Stores a value that expires at `expires_at`.
    ///
    /// Returns `false` without writing when `expires_at` is not in the future.
    pub fn add_until<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        match ttl_until(expires_at, self.now()) {
            Some(ttl) => self.add_with_ttl(key, value, ttl),
            None => {
                debug!(key, %expires_at, "Skipping write of already expired value");
                Ok(false)
            }
        }
    }

    pub fn remove(&self, key: &str) -> Result<bool, DomainError> {
        self.blocking.delete(&self.namespacer.storage_key(key))
    }

    /// Removes several keys, returning how many existed
    pub fn remove_all<K: AsRef<str>>(&self, keys: &[K]) -> Result<usize, DomainError> {
        self.blocking.delete_many(&self.storage_keys(keys))
    }

    /// Gets several values in key order; missing keys yield `None`
    pub fn get_all<T: DeserializeOwned, K: AsRef<str>>(
        &self,
        keys: &[K],
    ) -> Result<Vec<Option<T>>, DomainError> {
        self.blocking.get_many(&self.storage_keys(keys))
    }

    pub fn add_all<T: Serialize, K: AsRef<str>>(
        &self,
        items: &[(K, T)],
        ttl: Option<Duration>,
    ) -> Result<bool, DomainError> {
        for (key, value) in items {
            self.blocking
                .set(&self.namespacer.storage_key(key.as_ref()), value, ttl)?;
        }
        Ok(true)
    }

    /// Lists the logical keys matching a glob pattern.
    ///
    /// Results are limited to keys starting with this manager's prefix and
    /// separator. A manager whose prefix extends this one with the separator
    /// shares that range: under prefix `ids`, a key stored by prefix `ids_x`
    /// comes back as `x_<key>`.
    pub fn search_keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        let found = self.blocking.search_keys(&self.namespacer.pattern(pattern))?;
        Ok(self.logical_keys(found))
    }

    pub fn info(&self) -> Result<BTreeMap<String, String>, DomainError> {
        self.blocking.info()
    }

    // Async operations

    pub async fn exists_async(&self, key: &str) -> Result<bool, DomainError> {
        self.cache.exists(&self.namespacer.storage_key(key)).await
    }

    pub async fn get_async<T>(&self, key: &str) -> Result<Option<T>, DomainError>
    where
        T: DeserializeOwned + Send,
    {
        let storage_key = self.namespacer.storage_key(key);
        self.cache.get(&storage_key).await
    }

    pub async fn add_async<T>(&self, key: &str, value: &T) -> Result<bool, DomainError>
    where
        T: Serialize + Send + Sync,
    {
        let storage_key = self.namespacer.storage_key(key);
        self.cache.set(&storage_key, value, None).await?;
        Ok(true)
    }

    pub async fn add_with_ttl_async<T>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<bool, DomainError>
    where
        T: Serialize + Send + Sync,
    {
        let storage_key = self.namespacer.storage_key(key);
        self.cache.set(&storage_key, value, Some(ttl)).await?;
        Ok(true)
    }

    pub async fn add_until_async<T>(
        &self,
        key: &str,
        value: &T,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, DomainError>
    where
        T: Serialize + Send + Sync,
    {
        match ttl_until(expires_at, self.now()) {
            Some(ttl) => self.add_with_ttl_async(key, value, ttl).await,
            None => {
                debug!(key, %expires_at, "Skipping write of already expired value");
                Ok(false)
            }
        }
    }

    pub async fn remove_async(&self, key: &str) -> Result<bool, DomainError> {
        self.cache.delete(&self.namespacer.storage_key(key)).await
    }

    pub async fn remove_all_async<K: AsRef<str>>(&self, keys: &[K]) -> Result<usize, DomainError> {
        let storage_keys = self.storage_keys(keys);
        self.cache.delete_many(&storage_keys).await
    }

    pub async fn get_all_async<T, K>(&self, keys: &[K]) -> Result<Vec<Option<T>>, DomainError>
    where
        T: DeserializeOwned + Send,
        K: AsRef<str>,
    {
        let storage_keys = self.storage_keys(keys);
        self.cache.get_many(&storage_keys).await
    }

    pub async fn add_all_async<T, K>(
        &self,
        items: &[(K, T)],
        ttl: Option<Duration>,
    ) -> Result<bool, DomainError>
    where
        T: Serialize + Send + Sync,
        K: AsRef<str>,
    {
        for (key, value) in items {
            let storage_key = self.namespacer.storage_key(key.as_ref());
            self.cache.set(&storage_key, value, ttl).await?;
        }
        Ok(true)
    }

    /// Async counterpart of [`CacheManager::search_keys`], with the same
    /// prefix overlap.
    pub async fn search_keys_async(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        let found = self
            .cache
            .search_keys(&self.namespacer.pattern(pattern))
            .await?;
        Ok(self.logical_keys(found))
    }

    pub async fn info_async(&self) -> Result<BTreeMap<String, String>, DomainError> {
        self.cache.info().await
    }

    // Read-through helper

    /// Returns the cached value for `key`, computing and caching it for the
    /// default TTL on a miss.
    pub fn get_or_compute<T, E, F>(&self, key: &str, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<DomainError>,
        F: FnOnce() -> Result<T, E>,
    {
        self.get_or_compute_with_ttl(key, compute, self.default_ttl)
    }

    /// Blocking read-through with single-flight semantics.
    ///
    /// Callers missing on the same key serialize on that key's lock; only the
    /// first computes, the others find its value on the re-check. A failed
    /// computation caches nothing and releases the lock.
    #[instrument(level = "debug", skip(self, compute), fields(prefix = %self.namespacer.prefix()))]
    pub fn get_or_compute_with_ttl<T, E, F>(
        &self,
        key: &str,
        compute: F,
        ttl: Duration,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<DomainError>,
        F: FnOnce() -> Result<T, E>,
    {
        if !self.enabled {
            return compute();
        }

        let storage_key = self.namespacer.storage_key(key);

        if let Some(value) = self.blocking.get(&storage_key)? {
            debug!("Cache hit");
            return Ok(value);
        }

        self.locks.with_lock(&storage_key, || -> Result<T, E> {
            if let Some(value) = self.blocking.get(&storage_key)? {
                debug!("Cache hit after waiting for lock");
                return Ok(value);
            }

            debug!("Cache miss, computing value");
            let value = compute()?;
            self.blocking.set(&storage_key, &value, Some(ttl))?;
            Ok(value)
        })
    }

    /// Async counterpart of [`CacheManager::get_or_compute`]
    pub async fn get_or_compute_async<T, E, F, Fut>(&self, key: &str, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        E: From<DomainError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_compute_async_with_ttl(key, compute, self.default_ttl)
            .await
    }

    /// Async read-through without locking.
    ///
    /// Concurrent misses on one key may each compute and write; the last
    /// write wins.
    pub async fn get_or_compute_async_with_ttl<T, E, F, Fut>(
        &self,
        key: &str,
        compute: F,
        ttl: Duration,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        E: From<DomainError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.enabled {
            return compute().await;
        }

        let storage_key = self.namespacer.storage_key(key);

        if let Some(value) = self.cache.get(&storage_key).await? {
            debug!(key, "Cache hit");
            return Ok(value);
        }

        debug!(key, "Cache miss, computing value");
        let value = compute().await?;
        self.cache.set(&storage_key, &value, Some(ttl)).await?;
        Ok(value)
    }
}
