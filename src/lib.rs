//! Identity Cache
//!
//! Redis-backed caching for an OpenID Connect / OAuth2 identity provider:
//! - Namespaced keys so several caches can share one keyspace
//! - Read-through helper with single-flight blocking lookups
//! - Item caches for clients, scopes and user claims
//! - Token stores for refresh tokens and authorization codes

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use config::TtlConfig;
use infrastructure::cache::{CacheFactory, CacheManager};
use infrastructure::identity::{
    AuthorizationCodeStore, ClientStoreCache, RefreshTokenStore, ScopeStoreCache, StoreCache,
    TtlPolicy, UserClaimsCache,
};
use tracing::info;

/// Every identity cache, sharing one manager
#[derive(Debug, Clone)]
pub struct IdentityCaches {
    pub clients: ClientStoreCache,
    pub scopes: ScopeStoreCache,
    pub claims: UserClaimsCache,
    pub refresh_tokens: RefreshTokenStore,
    pub authorization_codes: AuthorizationCodeStore,
}

impl IdentityCaches {
    /// Builds the caches with the expirations of `ttl`
    pub fn new(manager: CacheManager, ttl: &TtlConfig) -> Self {
        let mut refresh_tokens = RefreshTokenStore::refresh_tokens(manager.clone());
        if let Some(cap) = ttl.refresh_token_cap() {
            refresh_tokens = refresh_tokens.with_max_ttl(cap);
        }

        let mut authorization_codes = AuthorizationCodeStore::authorization_codes(manager.clone());
        if let Some(cap) = ttl.authorization_code_cap() {
            authorization_codes = authorization_codes.with_max_ttl(cap);
        }

        Self {
            clients: StoreCache::new(manager.clone(), "clients", TtlPolicy::Fixed(ttl.client())),
            scopes: StoreCache::new(manager.clone(), "scopes", TtlPolicy::Fixed(ttl.scope())),
            claims: StoreCache::new(manager, "claims", TtlPolicy::Fixed(ttl.claims())),
            refresh_tokens,
            authorization_codes,
        }
    }
}

/// Connects to the configured store and returns its manager
pub async fn create_cache_manager(config: &AppConfig) -> anyhow::Result<CacheManager> {
    let cache_config = config.cache_config();
    let manager = CacheFactory::new().create_manager(&cache_config).await?;

    info!(
        backend = %cache_config.cache_type,
        prefix = manager.namespacer().prefix(),
        enabled = manager.is_enabled(),
        "Cache manager created"
    );

    Ok(manager)
}

/// Connects to the configured store and builds every identity cache on it
pub async fn create_identity_caches(config: &AppConfig) -> anyhow::Result<IdentityCaches> {
    let manager = create_cache_manager(config).await?;
    Ok(IdentityCaches::new(manager, &config.ttl))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::{Claim, ItemCache, RefreshToken, TokenStore};
    use crate::infrastructure::cache::CacheType;

    fn in_memory_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.cache.backend = CacheType::InMemory;
        config.cache.key_prefix = Some("test".into());
        config
    }

    #[tokio::test]
    async fn test_identity_caches_share_one_manager() {
        let caches = create_identity_caches(&in_memory_config()).await.unwrap();

        caches
            .claims
            .set("alice", vec![Claim::new("email", "alice@example.com")])
            .await
            .unwrap();
        caches
            .refresh_tokens
            .store("h1", RefreshToken::new("alice", "web", vec![], 600))
            .await
            .unwrap();

        let manager = create_cache_manager(&in_memory_config()).await.unwrap();
        assert!(manager.search_keys_async("*").await.unwrap().is_empty());

        assert_eq!(caches.claims.get("alice").await.unwrap().map(|c| c.len()), Some(1));
        assert_eq!(caches.refresh_tokens.get_all("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ttl_config_applies_to_item_caches() {
        let mut config = in_memory_config();
        config.ttl.claims_secs = 5;

        let caches = create_identity_caches(&config).await.unwrap();
        assert_eq!(
            caches.claims.policy(),
            TtlPolicy::Fixed(std::time::Duration::from_secs(5))
        );
        assert_eq!(caches.clients.segment(), "clients");
    }
}
