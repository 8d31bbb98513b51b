use std::time::Duration;

use serde::Deserialize;

use crate::infrastructure::cache::{CacheConfig, CacheType, LockStrategy, DEFAULT_LOCK_STRIPES};
use crate::infrastructure::identity::{CLAIMS_TTL, CLIENT_TTL, SCOPE_TTL};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub redis: RedisConfig,
    pub cache: CacheSection,
    pub ttl: TtlConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    pub connection_timeout_secs: u64,
    pub response_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockKind {
    #[default]
    Striped,
    PerKey,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub backend: CacheType,
    pub key_prefix: Option<String>,
    pub enabled: bool,
    pub default_ttl_secs: u64,
    pub lock_strategy: LockKind,
    pub lock_stripes: usize,
    pub max_capacity: u64,
}

/// Expiration of the identity caches, in seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    pub client_secs: u64,
    pub scope_secs: u64,
    pub claims_secs: u64,
    /// Upper bound for cached refresh tokens; unset means the token lifetime
    pub refresh_token_secs: Option<u64>,
    /// Upper bound for cached authorization codes; unset means the code lifetime
    pub authorization_code_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connection_timeout_secs: 5,
            response_timeout_secs: 2,
        }
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            backend: CacheType::Redis,
            key_prefix: None,
            enabled: true,
            default_ttl_secs: 30 * 60,
            lock_strategy: LockKind::Striped,
            lock_stripes: DEFAULT_LOCK_STRIPES,
            max_capacity: 10_000,
        }
    }
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            client_secs: CLIENT_TTL.as_secs(),
            scope_secs: SCOPE_TTL.as_secs(),
            claims_secs: CLAIMS_TTL.as_secs(),
            refresh_token_secs: None,
            authorization_code_secs: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl CacheSection {
    pub fn lock_strategy(&self) -> LockStrategy {
        match self.lock_strategy {
            LockKind::Striped => LockStrategy::Striped {
                stripes: self.lock_stripes,
            },
            LockKind::PerKey => LockStrategy::PerKey,
        }
    }
}

impl TtlConfig {
    pub fn client(&self) -> Duration {
        Duration::from_secs(self.client_secs)
    }

    pub fn scope(&self) -> Duration {
        Duration::from_secs(self.scope_secs)
    }

    pub fn claims(&self) -> Duration {
        Duration::from_secs(self.claims_secs)
    }

    pub fn refresh_token_cap(&self) -> Option<Duration> {
        self.refresh_token_secs.map(Duration::from_secs)
    }

    pub fn authorization_code_cap(&self) -> Option<Duration> {
        self.authorization_code_secs.map(Duration::from_secs)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Store and manager settings for the cache factory
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            cache_type: self.cache.backend,
            redis_url: Some(self.redis.url.clone()),
            connection_timeout: Duration::from_secs(self.redis.connection_timeout_secs),
            response_timeout: Duration::from_secs(self.redis.response_timeout_secs),
            key_prefix: self.cache.key_prefix.clone(),
            enabled: self.cache.enabled,
            default_ttl: Duration::from_secs(self.cache.default_ttl_secs),
            lock_strategy: self.cache.lock_strategy(),
            max_capacity: Some(self.cache.max_capacity),
        }
    }
}
