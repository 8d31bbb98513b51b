//! Token stores for refresh tokens and authorization codes

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::domain::cache::escape_pattern;
use crate::domain::identity::{AuthorizationCode, RefreshToken, TokenMetadata, TokenStore};
use crate::domain::DomainError;
use crate::infrastructure::cache::CacheManager;

pub const REFRESH_TOKEN_SEGMENT: &str = "refresh_tokens";
pub const AUTHORIZATION_CODE_SEGMENT: &str = "authorization_codes";

/// Encodes a key component so it never contains the `:` separator
fn encode_part(part: &str) -> String {
    part.replace('%', "%25").replace(':', "%3A")
}

/// Pattern fragment matching exactly one encoded component
fn literal(part: &str) -> String {
    escape_pattern(&encode_part(part))
}

/// [`TokenStore`] over a [`CacheManager`]
///
/// Tokens are kept under `"{segment}:{client}:{subject}:{handle}"`, so a
/// subject's tokens can be listed and revoked per client with a key search.
/// Each entry expires with the token itself, optionally capped.
pub struct CachedTokenStore<T> {
    manager: CacheManager,
    segment: String,
    max_ttl: Option<Duration>,
    _marker: PhantomData<fn() -> T>,
}

pub type RefreshTokenStore = CachedTokenStore<RefreshToken>;
pub type AuthorizationCodeStore = CachedTokenStore<AuthorizationCode>;

impl<T> fmt::Debug for CachedTokenStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedTokenStore")
            .field("segment", &self.segment)
            .field("max_ttl", &self.max_ttl)
            .finish()
    }
}

impl<T> Clone for CachedTokenStore<T> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            segment: self.segment.clone(),
            max_ttl: self.max_ttl,
            _marker: PhantomData,
        }
    }
}

impl RefreshTokenStore {
    pub fn refresh_tokens(manager: CacheManager) -> Self {
        Self::new(manager, REFRESH_TOKEN_SEGMENT)
    }
}

impl AuthorizationCodeStore {
    pub fn authorization_codes(manager: CacheManager) -> Self {
        Self::new(manager, AUTHORIZATION_CODE_SEGMENT)
    }
}

impl<T: TokenMetadata> CachedTokenStore<T> {
    pub fn new(manager: CacheManager, segment: impl Into<String>) -> Self {
        Self {
            manager,
            segment: segment.into(),
            max_ttl: None,
            _marker: PhantomData,
        }
    }

    /// Caps how long any token stays cached, whatever its lifetime
    pub fn with_max_ttl(mut self, max_ttl: Duration) -> Self {
        self.max_ttl = Some(max_ttl);
        self
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    fn entry_key(&self, client: &str, subject: &str, handle: &str) -> String {
        format!(
            "{}:{}:{}:{}",
            self.segment,
            encode_part(client),
            encode_part(subject),
            encode_part(handle)
        )
    }

    fn handle_pattern(&self, handle: &str) -> String {
        format!("{}:*:*:{}", escape_pattern(&self.segment), literal(handle))
    }

    fn subject_pattern(&self, subject: &str) -> String {
        format!("{}:*:{}:*", escape_pattern(&self.segment), literal(subject))
    }

    fn grant_pattern(&self, subject: &str, client: &str) -> String {
        format!(
            "{}:{}:{}:*",
            escape_pattern(&self.segment),
            literal(client),
            literal(subject)
        )
    }

    fn expiry_of(&self, token: &T) -> DateTime<Utc> {
        let expires_at = token.expires_at();

        match self
            .max_ttl
            .and_then(|cap| chrono::Duration::from_std(cap).ok())
            .and_then(|cap| self.manager.now().checked_add_signed(cap))
        {
            Some(capped) if capped < expires_at => capped,
            _ => expires_at,
        }
    }

    async fn find(&self, handle: &str) -> Result<Vec<String>, DomainError> {
        self.manager
            .search_keys_async(&self.handle_pattern(handle))
            .await
    }

    async fn load_all(&self, keys: &[String]) -> Result<Vec<T>, DomainError> {
        let now = self.manager.now();
        let tokens: Vec<Option<T>> = self.manager.get_all_async(keys).await?;

        Ok(tokens
            .into_iter()
            .flatten()
            .filter(|token| !token.is_expired_at(now))
            .collect())
    }
}

#[async_trait]
impl<T: TokenMetadata> TokenStore<T> for CachedTokenStore<T> {
    async fn store(&self, key: &str, value: T) -> Result<(), DomainError> {
        let entry_key = self.entry_key(value.client_id(), value.subject_id(), key);
        let expires_at = self.expiry_of(&value);

        let written = self
            .manager
            .add_until_async(&entry_key, &value, expires_at)
            .await?;

        if written {
            debug!(segment = %self.segment, %expires_at, "Stored token");
        } else {
            debug!(segment = %self.segment, %expires_at, "Token already expired, not stored");
        }

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<T>, DomainError> {
        let keys = self.find(key).await?;
        Ok(self.load_all(&keys).await?.into_iter().next())
    }

    async fn remove(&self, key: &str) -> Result<(), DomainError> {
        let keys = self.find(key).await?;
        self.manager.remove_all_async(&keys).await?;
        Ok(())
    }

    async fn get_all(&self, subject: &str) -> Result<Vec<T>, DomainError> {
        let keys = self
            .manager
            .search_keys_async(&self.subject_pattern(subject))
            .await?;

        self.load_all(&keys).await
    }

    async fn revoke(&self, subject: &str, client: &str) -> Result<(), DomainError> {
        let keys = self
            .manager
            .search_keys_async(&self.grant_pattern(subject, client))
            .await?;

        let removed = self.manager.remove_all_async(&keys).await?;
        info!(segment = %self.segment, subject, client, removed, "Revoked tokens");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{MockCache, StoreHandle};
    use crate::infrastructure::cache::{
        CacheSettings, Clock, InMemoryCache, InMemoryCacheConfig, ManualClock,
    };
    use std::sync::Arc;

    fn in_memory_manager() -> CacheManager {
        CacheManager::new(
            StoreHandle::new(Arc::new(InMemoryCache::new())),
            CacheSettings::default(),
        )
    }

    fn token(subject: &str, client: &str) -> RefreshToken {
        RefreshToken::new(subject, client, vec!["openid".into(), "offline_access".into()], 3600)
    }

    #[tokio::test]
    async fn test_store_uses_client_subject_handle_key() {
        let mock = Arc::new(MockCache::new());
        let manager = CacheManager::new(StoreHandle::new(mock.clone()), CacheSettings::default());
        let store = RefreshTokenStore::refresh_tokens(manager);

        store.store("h1", token("alice", "web")).await.unwrap();

        assert_eq!(mock.keys(), vec!["idscache_refresh_tokens:web:alice:h1"]);
        let ttl = mock.ttl_of("idscache_refresh_tokens:web:alice:h1").unwrap();
        assert!(ttl <= Duration::from_secs(3600) && ttl > Duration::from_secs(3500));
    }

    #[tokio::test]
    async fn test_get_by_handle() {
        let store = RefreshTokenStore::refresh_tokens(in_memory_manager());
        let alice = token("alice", "web");

        store.store("h1", alice.clone()).await.unwrap();
        store.store("h2", token("bob", "web")).await.unwrap();

        assert_eq!(store.get("h1").await.unwrap(), Some(alice));
        assert!(store.get("h3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_all_by_subject() {
        let store = RefreshTokenStore::refresh_tokens(in_memory_manager());

        store.store("h1", token("alice", "web")).await.unwrap();
        store.store("h2", token("alice", "mobile")).await.unwrap();
        store.store("h3", token("bob", "web")).await.unwrap();

        let mut clients: Vec<String> = store
            .get_all("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.client_id)
            .collect();
        clients.sort();

        assert_eq!(clients, vec!["mobile", "web"]);
    }

    #[tokio::test]
    async fn test_revoke_only_affects_subject_and_client() {
        let store = RefreshTokenStore::refresh_tokens(in_memory_manager());

        store.store("h1", token("alice", "web")).await.unwrap();
        store.store("h2", token("alice", "web")).await.unwrap();
        store.store("h3", token("alice", "mobile")).await.unwrap();
        store.store("h4", token("bob", "web")).await.unwrap();

        store.revoke("alice", "web").await.unwrap();

        assert!(store.get("h1").await.unwrap().is_none());
        assert!(store.get("h2").await.unwrap().is_none());
        assert!(store.get("h3").await.unwrap().is_some());
        assert!(store.get("h4").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_by_handle() {
        let store = RefreshTokenStore::refresh_tokens(in_memory_manager());

        store.store("h1", token("alice", "web")).await.unwrap();
        store.remove("h1").await.unwrap();

        assert!(store.get("h1").await.unwrap().is_none());
        assert!(store.get_all("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_separator_and_glob_characters_in_identifiers() {
        let store = RefreshTokenStore::refresh_tokens(in_memory_manager());

        store.store("h:1", token("user*1", "web")).await.unwrap();
        store.store("1", token("user?1", "web")).await.unwrap();

        assert_eq!(store.get("h:1").await.unwrap().map(|t| t.subject_id), Some("user*1".into()));
        assert_eq!(store.get("1").await.unwrap().map(|t| t.subject_id), Some("user?1".into()));
        assert_eq!(store.get_all("user*1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_expired_token_is_not_stored() {
        let mock = Arc::new(MockCache::new());
        let manager = CacheManager::new(StoreHandle::new(mock.clone()), CacheSettings::default());
        let store = RefreshTokenStore::refresh_tokens(manager);

        let stale = token("alice", "web").created(Utc::now() - chrono::Duration::hours(2));
        store.store("old", stale).await.unwrap();

        assert_eq!(mock.writes(), 0);
    }

    #[tokio::test]
    async fn test_max_ttl_caps_expiry() {
        let mock = Arc::new(MockCache::new());
        let manager = CacheManager::new(StoreHandle::new(mock.clone()), CacheSettings::default());
        let store = RefreshTokenStore::refresh_tokens(manager).with_max_ttl(Duration::from_secs(60));

        store.store("h1", token("alice", "web")).await.unwrap();

        let ttl = mock.ttl_of("idscache_refresh_tokens:web:alice:h1").unwrap();
        assert!(ttl <= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_authorization_codes_are_kept_apart() {
        let manager = in_memory_manager();
        let codes = AuthorizationCodeStore::authorization_codes(manager.clone());
        let tokens = RefreshTokenStore::refresh_tokens(manager);

        let code = AuthorizationCode::new("alice", "web", "https://app/cb", vec!["openid".into()], 300);
        codes.store("c1", code.clone()).await.unwrap();
        tokens.store("c1", token("alice", "web")).await.unwrap();

        assert_eq!(codes.get("c1").await.unwrap(), Some(code));
        assert_eq!(codes.get_all("alice").await.unwrap().len(), 1);

        codes.remove("c1").await.unwrap();
        assert!(tokens.get("c1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_token_expiry_follows_manager_clock() {
        let clock = Arc::new(ManualClock::new(Utc::now() - chrono::Duration::days(30)));
        let store = InMemoryCache::with_clock(InMemoryCacheConfig::default(), clock.clone());
        let manager = CacheManager::new(StoreHandle::new(Arc::new(store)), CacheSettings::default())
            .with_clock(clock.clone());
        let tokens = RefreshTokenStore::refresh_tokens(manager);

        let issued = token("alice", "web").created(clock.now());
        tokens.store("h1", issued.clone()).await.unwrap();
        assert_eq!(tokens.get("h1").await.unwrap(), Some(issued));

        clock.advance(Duration::from_secs(3601));
        assert!(tokens.get("h1").await.unwrap().is_none());
        assert!(tokens.get_all("alice").await.unwrap().is_empty());
    }

    #[test]
    fn test_encode_part() {
        assert_eq!(encode_part("a:b%c"), "a%3Ab%25c");
        assert_eq!(literal("a*:b"), "a\\*%3Ab");
    }
}
