//! Cache contracts consumed by the identity provider

use std::fmt::Debug;

use async_trait::async_trait;

use super::token::TokenMetadata;
use crate::domain::DomainError;

/// Read-through cache for one kind of configuration item
#[async_trait]
pub trait ItemCache<T>: Send + Sync + Debug
where
    T: Send + 'static,
{
    /// Gets the cached item, `None` on a miss
    async fn get(&self, key: &str) -> Result<Option<T>, DomainError>;

    /// Caches an item under the cache's expiration policy
    async fn set(&self, key: &str, item: T) -> Result<(), DomainError>;
}

/// Persistence for grant artifacts (refresh tokens, authorization codes)
#[async_trait]
pub trait TokenStore<T>: Send + Sync + Debug
where
    T: TokenMetadata,
{
    /// Stores a token under its handle
    async fn store(&self, key: &str, value: T) -> Result<(), DomainError>;

    /// Loads a token by handle
    async fn get(&self, key: &str) -> Result<Option<T>, DomainError>;

    /// Removes a token by handle
    async fn remove(&self, key: &str) -> Result<(), DomainError>;

    /// Lists every token issued to a subject
    async fn get_all(&self, subject: &str) -> Result<Vec<T>, DomainError>;

    /// Removes every token issued to `subject` for `client`
    async fn revoke(&self, subject: &str, client: &str) -> Result<(), DomainError>;
}
