//! Cache trait definitions

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::DomainError;

/// Asynchronous key/value store with TTL support
///
/// Values are JSON strings so the trait stays dyn-compatible. Keys passed
/// here are storage keys; namespacing happens above this layer.
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    /// Gets a raw JSON value
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Gets several raw values in one round trip, preserving order
    async fn get_many_raw(&self, keys: &[String]) -> Result<Vec<Option<String>>, DomainError> {
        let mut values = Vec::with_capacity(keys.len());

        for key in keys {
            values.push(self.get_raw(key).await?);
        }

        Ok(values)
    }

    /// Stores a raw JSON value; `None` means no expiration
    async fn set_raw(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), DomainError>;

    /// Deletes a key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Deletes several keys, returning how many existed
    async fn delete_many(&self, keys: &[String]) -> Result<usize, DomainError> {
        let mut deleted = 0;

        for key in keys {
            if self.delete(key).await? {
                deleted += 1;
            }
        }

        Ok(deleted)
    }

    /// Checks if a key exists
    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.get_raw(key).await?.is_some())
    }

    /// Lists the keys matching a glob pattern
    async fn search_keys(&self, pattern: &str) -> Result<Vec<String>, DomainError>;

    /// Returns backend information
    async fn info(&self) -> Result<BTreeMap<String, String>, DomainError>;
}

/// Blocking counterpart of [`Cache`] with identical semantics
pub trait BlockingCache: Send + Sync + Debug {
    fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    fn get_many_raw(&self, keys: &[String]) -> Result<Vec<Option<String>>, DomainError> {
        keys.iter().map(|key| self.get_raw(key)).collect()
    }

    fn set_raw(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), DomainError>;

    fn delete(&self, key: &str) -> Result<bool, DomainError>;

    fn delete_many(&self, keys: &[String]) -> Result<usize, DomainError> {
        let mut deleted = 0;

        for key in keys {
            if self.delete(key)? {
                deleted += 1;
            }
        }

        Ok(deleted)
    }

    fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.get_raw(key)?.is_some())
    }

    fn search_keys(&self, pattern: &str) -> Result<Vec<String>, DomainError>;

    fn info(&self) -> Result<BTreeMap<String, String>, DomainError>;
}

fn decode<V: DeserializeOwned>(data: &str) -> Result<V, DomainError> {
    serde_json::from_str(data).map_err(|e| {
        DomainError::serialization(format!("Failed to deserialize cache value: {}", e))
    })
}

fn encode<V: Serialize + ?Sized>(value: &V) -> Result<String, DomainError> {
    serde_json::to_string(value)
        .map_err(|e| DomainError::serialization(format!("Failed to serialize cache value: {}", e)))
}

/// Extension trait providing typed get/set operations
pub trait CacheExt: Cache {
    /// Gets a typed value from the cache
    fn get<'a, V>(
        &'a self,
        key: &'a str,
    ) -> impl std::future::Future<Output = Result<Option<V>, DomainError>> + Send
    where
        V: DeserializeOwned + Send,
    {
        async move {
            match self.get_raw(key).await? {
                Some(data) => Ok(Some(decode(&data)?)),
                None => Ok(None),
            }
        }
    }

    /// Gets several typed values; missing keys yield `None`
    fn get_many<'a, V>(
        &'a self,
        keys: &'a [String],
    ) -> impl std::future::Future<Output = Result<Vec<Option<V>>, DomainError>> + Send
    where
        V: DeserializeOwned + Send,
    {
        async move {
            self.get_many_raw(keys)
                .await?
                .into_iter()
                .map(|raw| raw.as_deref().map(decode::<V>).transpose())
                .collect()
        }
    }

    /// Sets a typed value in the cache
    fn set<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
        ttl: Option<Duration>,
    ) -> impl std::future::Future<Output = Result<(), DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = encode(value)?;
            self.set_raw(key, &data, ttl).await
        }
    }
}

impl<T: Cache + ?Sized> CacheExt for T {}

/// Typed operations for [`BlockingCache`]
pub trait BlockingCacheExt: BlockingCache {
    fn get<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>, DomainError> {
        match self.get_raw(key)? {
            Some(data) => Ok(Some(decode(&data)?)),
            None => Ok(None),
        }
    }

    fn get_many<V: DeserializeOwned>(&self, keys: &[String]) -> Result<Vec<Option<V>>, DomainError> {
        self.get_many_raw(keys)?
            .into_iter()
            .map(|raw| raw.as_deref().map(decode::<V>).transpose())
            .collect()
    }

    fn set<V: Serialize>(&self, key: &str, value: &V, ttl: Option<Duration>) -> Result<(), DomainError> {
        let data = encode(value)?;
        self.set_raw(key, &data, ttl)
    }
}

impl<T: BlockingCache + ?Sized> BlockingCacheExt for T {}

/// Both views of a single backing store
#[derive(Debug, Clone)]
pub struct StoreHandle {
    pub cache: Arc<dyn Cache>,
    pub blocking: Arc<dyn BlockingCache>,
}

impl StoreHandle {
    /// Wraps a store implementing both calling conventions
    pub fn new<S>(store: Arc<S>) -> Self
    where
        S: Cache + BlockingCache + 'static,
    {
        Self {
            cache: store.clone(),
            blocking: store,
        }
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::domain::cache::GlobPattern;

    /// Mock cache for testing
    ///
    /// Ignores TTLs, counts reads and writes, and can be told to fail.
    #[derive(Debug, Default)]
    pub struct MockCache {
        entries: Mutex<HashMap<String, (String, Option<Duration>)>>,
        error: Mutex<Option<String>>,
        reads: AtomicUsize,
        writes: AtomicUsize,
    }

    impl MockCache {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_entry<V: Serialize>(self, key: &str, value: &V, ttl: Option<Duration>) -> Self {
            let json = serde_json::to_string(value).unwrap();
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (json, ttl));
            self
        }

        pub fn with_error(self, error: impl Into<String>) -> Self {
            self.set_error(Some(error.into()));
            self
        }

        pub fn set_error(&self, error: Option<String>) {
            *self.error.lock().unwrap() = error;
        }

        pub fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        pub fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        pub fn ttl_of(&self, key: &str) -> Option<Duration> {
            self.entries
                .lock()
                .unwrap()
                .get(key)
                .and_then(|(_, ttl)| *ttl)
        }

        pub fn keys(&self) -> Vec<String> {
            let mut keys: Vec<String> = self.entries.lock().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        }

        fn check_error(&self) -> Result<(), DomainError> {
            if let Some(error) = self.error.lock().unwrap().clone() {
                return Err(DomainError::cache(error));
            }
            Ok(())
        }

        fn read(&self, key: &str) -> Result<Option<String>, DomainError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.check_error()?;
            Ok(self.entries.lock().unwrap().get(key).map(|(json, _)| json.clone()))
        }

        fn write(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), DomainError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.check_error()?;
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (value.to_string(), ttl));
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<bool, DomainError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.check_error()?;
            Ok(self.entries.lock().unwrap().remove(key).is_some())
        }

        fn search(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.check_error()?;
            let glob = GlobPattern::new(pattern)?;
            let mut keys: Vec<String> = self
                .entries
                .lock()
                .unwrap()
                .keys()
                .filter(|k| glob.is_match(k))
                .cloned()
                .collect();
            keys.sort();
            Ok(keys)
        }

        fn describe(&self) -> Result<BTreeMap<String, String>, DomainError> {
            self.check_error()?;
            let mut info = BTreeMap::new();
            info.insert("backend".to_string(), "mock".to_string());
            info.insert(
                "entries".to_string(),
                self.entries.lock().unwrap().len().to_string(),
            );
            Ok(info)
        }
    }

    #[async_trait]
    impl Cache for MockCache {
        async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
            self.read(key)
        }

        async fn set_raw(
            &self,
            key: &str,
            value: &str,
            ttl: Option<Duration>,
        ) -> Result<(), DomainError> {
            self.write(key, value, ttl)
        }

        async fn delete(&self, key: &str) -> Result<bool, DomainError> {
            self.remove(key)
        }

        async fn search_keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
            self.search(pattern)
        }

        async fn info(&self) -> Result<BTreeMap<String, String>, DomainError> {
            self.describe()
        }
    }

    impl BlockingCache for MockCache {
        fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
            self.read(key)
        }

        fn set_raw(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), DomainError> {
            self.write(key, value, ttl)
        }

        fn delete(&self, key: &str) -> Result<bool, DomainError> {
            self.remove(key)
        }

        fn search_keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
            self.search(pattern)
        }

        fn info(&self) -> Result<BTreeMap<String, String>, DomainError> {
            self.describe()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_cache_set_get() {
            let cache = MockCache::new();
            CacheExt::set(&cache, "key1", &"value1", Some(Duration::from_secs(60)))
                .await
                .unwrap();

            let result: Option<String> = CacheExt::get(&cache, "key1").await.unwrap();
            assert_eq!(result, Some("value1".to_string()));
        }

        #[test]
        fn test_mock_cache_blocking_view_shares_entries() {
            let cache = MockCache::new().with_entry("key1", &7u32, None);

            let result: Option<u32> = BlockingCacheExt::get(&cache, "key1").unwrap();
            assert_eq!(result, Some(7));
            assert_eq!(cache.reads(), 1);
        }

        #[tokio::test]
        async fn test_mock_cache_with_error() {
            let cache = MockCache::new().with_error("Test error");

            let result: Result<Option<String>, _> = CacheExt::get(&cache, "key").await;
            assert!(result.is_err());
        }

        #[tokio::test]
        async fn test_get_many_preserves_order() {
            let cache = MockCache::new()
                .with_entry("a", &1u32, None)
                .with_entry("c", &3u32, None);

            let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
            let values: Vec<Option<u32>> = CacheExt::get_many(&cache, &keys).await.unwrap();
            assert_eq!(values, vec![Some(1), None, Some(3)]);
        }

        #[tokio::test]
        async fn test_delete_many_counts_existing() {
            let cache = MockCache::new().with_entry("a", &1u32, None);

            let keys = vec!["a".to_string(), "missing".to_string()];
            let deleted = Cache::delete_many(&cache, &keys).await.unwrap();
            assert_eq!(deleted, 1);
        }

        #[test]
        fn test_search_keys_glob() {
            let cache = MockCache::new()
                .with_entry("user:1:profile", &"a", None)
                .with_entry("user:2:profile", &"b", None)
                .with_entry("other:key", &"c", None);

            let keys = BlockingCache::search_keys(&cache, "user:*:profile").unwrap();
            assert_eq!(keys, vec!["user:1:profile", "user:2:profile"]);
        }
    }
}
