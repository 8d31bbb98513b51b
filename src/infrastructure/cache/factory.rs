//! Cache factory for runtime selection

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::cache::StoreHandle;
use crate::domain::DomainError;

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use super::lock::{LockStrategy, DEFAULT_LOCK_STRIPES};
use super::manager::{CacheManager, CacheSettings, DEFAULT_TTL};
use super::redis::{RedisCache, RedisCacheConfig};

/// Supported cache types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheType {
    /// In-memory cache using moka
    InMemory,
    /// Redis cache
    #[default]
    Redis,
}

impl std::fmt::Display for CacheType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheType::InMemory => write!(f, "in_memory"),
            CacheType::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for CacheType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(CacheType::InMemory),
            "redis" => Ok(CacheType::Redis),
            _ => Err(DomainError::configuration(format!(
                "Unknown cache type: {}. Valid types: in_memory, redis",
                s
            ))),
        }
    }
}

/// Configuration for cache factory
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Type of cache to create
    pub cache_type: CacheType,
    /// Redis URL (required for Redis type)
    pub redis_url: Option<String>,
    /// Redis connection timeout
    pub connection_timeout: Duration,
    /// Redis response timeout for blocking calls
    pub response_timeout: Duration,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
    /// Whether the read-through helper uses the store at all
    pub enabled: bool,
    /// Default TTL of the read-through helper
    pub default_ttl: Duration,
    /// Key lock layout of the read-through helper
    pub lock_strategy: LockStrategy,
    /// Maximum capacity (for in-memory cache)
    pub max_capacity: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let redis = RedisCacheConfig::default();

        Self {
            cache_type: CacheType::Redis,
            redis_url: Some(redis.url),
            connection_timeout: redis.connection_timeout,
            response_timeout: redis.response_timeout,
            key_prefix: None,
            enabled: true,
            default_ttl: DEFAULT_TTL,
            lock_strategy: LockStrategy::default(),
            max_capacity: Some(10_000),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

impl CacheConfig {
    /// Creates a new configuration for in-memory cache
    pub fn in_memory() -> Self {
        Self {
            cache_type: CacheType::InMemory,
            redis_url: None,
            ..Default::default()
        }
    }

    /// Creates a new configuration for Redis cache
    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            cache_type: CacheType::Redis,
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Sets the default TTL
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Turns the read-through helper on or off
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_lock_strategy(mut self, strategy: LockStrategy) -> Self {
        self.lock_strategy = strategy;
        self
    }

    /// Sets the maximum capacity (in-memory only)
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Creates config from environment variables
    pub fn from_env() -> Result<Self, DomainError> {
        let cache_type = std::env::var("CACHE_TYPE")
            .unwrap_or_else(|_| CacheType::default().to_string())
            .parse()?;

        let defaults = Self::default();

        let redis_url = std::env::var("REDIS_URL").ok().or(defaults.redis_url);
        let key_prefix = std::env::var("CACHE_KEY_PREFIX").ok();

        let default_ttl = env_parse("CACHE_DEFAULT_TTL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TTL);

        let enabled = env_parse("CACHE_ENABLED").unwrap_or(true);

        let lock_strategy = match std::env::var("CACHE_LOCK_STRATEGY").ok().as_deref() {
            Some("per_key") => LockStrategy::PerKey,
            Some("striped") | None => LockStrategy::Striped {
                stripes: env_parse("CACHE_LOCK_STRIPES").unwrap_or(DEFAULT_LOCK_STRIPES),
            },
            Some(other) => {
                return Err(DomainError::configuration(format!(
                    "Unknown lock strategy: {}. Valid strategies: striped, per_key",
                    other
                )));
            }
        };

        Ok(Self {
            cache_type,
            redis_url,
            key_prefix,
            enabled,
            default_ttl,
            lock_strategy,
            max_capacity: env_parse("CACHE_MAX_CAPACITY").or(defaults.max_capacity),
            ..defaults
        })
    }

    /// Settings of the manager built on top of the store
    pub fn settings(&self) -> CacheSettings {
        CacheSettings {
            key_prefix: self.key_prefix.clone(),
            enabled: self.enabled,
            default_ttl: self.default_ttl,
            lock_strategy: self.lock_strategy,
        }
    }

    /// Store configuration used for the in-memory backend
    pub fn in_memory_config(&self) -> InMemoryCacheConfig {
        let config = InMemoryCacheConfig::default();

        match self.max_capacity {
            Some(capacity) => config.with_max_capacity(capacity),
            None => config,
        }
    }
}

/// Factory for creating cache instances
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    /// Creates a new cache factory
    pub fn new() -> Self {
        Self
    }

    /// Creates the backing store selected by the configuration
    pub async fn create(&self, config: &CacheConfig) -> Result<StoreHandle, DomainError> {
        match config.cache_type {
            CacheType::InMemory => {
                let in_memory_config = config.in_memory_config();

                info!(max_capacity = in_memory_config.max_capacity, "Using in-memory cache");
                Ok(StoreHandle::new(Arc::new(InMemoryCache::with_config(
                    in_memory_config,
                ))))
            }
            CacheType::Redis => {
                let url = config.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("Redis URL is required for Redis cache type")
                })?;

                let redis_config = RedisCacheConfig::new(url)
                    .with_connection_timeout(config.connection_timeout)
                    .with_response_timeout(config.response_timeout);

                let cache = RedisCache::new(redis_config).await?;
                Ok(StoreHandle::new(Arc::new(cache)))
            }
        }
    }

    /// Creates the store and wraps it in a [`CacheManager`]
    pub async fn create_manager(&self, config: &CacheConfig) -> Result<CacheManager, DomainError> {
        let store = self.create(config).await?;
        Ok(CacheManager::new(store, config.settings()))
    }

    /// Creates an in-memory store with default settings
    pub fn create_in_memory(&self) -> StoreHandle {
        StoreHandle::new(Arc::new(InMemoryCache::new()))
    }
}
