//! Item caches for clients, scopes and user claims

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::domain::identity::{Claim, Client, ItemCache, Scope};
use crate::domain::DomainError;
use crate::infrastructure::cache::CacheManager;

/// Default TTL of cached clients
pub const CLIENT_TTL: Duration = Duration::from_secs(2 * 60 * 60);
/// Default TTL of cached scope lists
pub const SCOPE_TTL: Duration = Duration::from_secs(2 * 60 * 60);
/// Default TTL of cached user claims
pub const CLAIMS_TTL: Duration = Duration::from_secs(30 * 60);

/// Expiration applied to every item written through a [`StoreCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlPolicy {
    Fixed(Duration),
    Never,
}

impl TtlPolicy {
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            TtlPolicy::Fixed(ttl) => Some(*ttl),
            TtlPolicy::Never => None,
        }
    }
}

/// [`ItemCache`] over a [`CacheManager`]
///
/// Items live under `"{segment}:{key}"` so several item caches can share one
/// manager without their keys colliding.
pub struct StoreCache<T> {
    manager: CacheManager,
    segment: String,
    policy: TtlPolicy,
    _marker: PhantomData<fn() -> T>,
}

pub type ClientStoreCache = StoreCache<Client>;
pub type ScopeStoreCache = StoreCache<Vec<Scope>>;
pub type UserClaimsCache = StoreCache<Vec<Claim>>;

impl<T> fmt::Debug for StoreCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCache")
            .field("segment", &self.segment)
            .field("policy", &self.policy)
            .finish()
    }
}

impl<T> Clone for StoreCache<T> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            segment: self.segment.clone(),
            policy: self.policy,
            _marker: PhantomData,
        }
    }
}

impl<T> StoreCache<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(manager: CacheManager, segment: impl Into<String>, policy: TtlPolicy) -> Self {
        Self {
            manager,
            segment: segment.into(),
            policy,
            _marker: PhantomData,
        }
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn policy(&self) -> TtlPolicy {
        self.policy
    }

    fn item_key(&self, key: &str) -> String {
        format!("{}:{}", self.segment, key)
    }

    /// Returns the cached item, loading and caching it on a miss.
    ///
    /// Items without expiration are cached for the manager's default TTL.
    pub async fn get_or_load<E, F, Fut>(&self, key: &str, load: F) -> Result<T, E>
    where
        E: From<DomainError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let ttl = self.policy.ttl().unwrap_or(self.manager.default_ttl());

        self.manager
            .get_or_compute_async_with_ttl(&self.item_key(key), load, ttl)
            .await
    }

    /// Drops a cached item
    pub async fn invalidate(&self, key: &str) -> Result<bool, DomainError> {
        self.manager.remove_async(&self.item_key(key)).await
    }
}

impl ClientStoreCache {
    /// Client cache with the default two hour TTL
    pub fn clients(manager: CacheManager) -> Self {
        Self::new(manager, "clients", TtlPolicy::Fixed(CLIENT_TTL))
    }
}

impl ScopeStoreCache {
    /// Scope cache with the default two hour TTL
    pub fn scopes(manager: CacheManager) -> Self {
        Self::new(manager, "scopes", TtlPolicy::Fixed(SCOPE_TTL))
    }
}

impl UserClaimsCache {
    /// Claims cache with the default thirty minute TTL
    pub fn claims(manager: CacheManager) -> Self {
        Self::new(manager, "claims", TtlPolicy::Fixed(CLAIMS_TTL))
    }
}

#[async_trait]
impl<T> ItemCache<T> for StoreCache<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<T>, DomainError> {
        self.manager.get_async(&self.item_key(key)).await
    }

    async fn set(&self, key: &str, item: T) -> Result<(), DomainError> {
        let item_key = self.item_key(key);
        debug!(segment = %self.segment, key, policy = ?self.policy, "Caching item");

        match self.policy.ttl() {
            Some(ttl) => self.manager.add_with_ttl_async(&item_key, &item, ttl).await?,
            None => self.manager.add_async(&item_key, &item).await?,
        };

        Ok(())
    }
}
