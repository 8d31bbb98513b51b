//! Redis cache implementation

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Commands, Connection, RedisError};
use tracing::{debug, info, warn};

use crate::domain::cache::{BlockingCache, Cache};
use crate::domain::DomainError;

const SCAN_COUNT: usize = 100;

/// Configuration for Redis cache
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Connection timeout
    pub connection_timeout: Duration,
    /// Read/write timeout of the blocking connection
    pub response_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connection_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(2),
        }
    }
}

impl RedisCacheConfig {
    /// Creates a new configuration with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the connection timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Sets the response timeout
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }
}

/// Redis-backed store
///
/// The async view multiplexes over a [`ConnectionManager`], which reconnects
/// on its own. The blocking view keeps one dedicated connection, opened
/// lazily and dropped after an I/O failure so the next call reconnects.
pub struct RedisCache {
    client: Client,
    connection: ConnectionManager,
    blocking: Mutex<Option<Connection>>,
    config: RedisCacheConfig,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

fn map_error(action: &str, key: &str, err: RedisError) -> DomainError {
    DomainError::cache(format!("Failed to {} '{}': {}", action, key, err))
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn set_command(key: &str, value: &str, ttl: Option<Duration>) -> redis::Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(value);

    if let Some(ttl) = ttl {
        cmd.arg("PX").arg(ttl_millis(ttl));
    }

    cmd
}

fn scan_command(cursor: u64, pattern: &str) -> redis::Cmd {
    let mut cmd = redis::cmd("SCAN");
    cmd.arg(cursor)
        .arg("MATCH")
        .arg(pattern)
        .arg("COUNT")
        .arg(SCAN_COUNT);
    cmd
}

/// Parses the text returned by `INFO` into a flat map
fn parse_info(raw: &str) -> BTreeMap<String, String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl RedisCache {
    /// Connects to Redis
    pub async fn new(config: RedisCacheConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::configuration(format!("Invalid Redis URL: {}", e)))?;

        let connection = tokio::time::timeout(
            config.connection_timeout,
            ConnectionManager::new(client.clone()),
        )
        .await
        .map_err(|_| {
            DomainError::cache(format!(
                "Timed out connecting to Redis after {:?}",
                config.connection_timeout
            ))
        })?
        .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))?;

        info!(timeout = ?config.connection_timeout, "Connected to Redis");

        Ok(Self {
            client,
            connection,
            blocking: Mutex::new(None),
            config,
        })
    }

    /// Connects to Redis with default settings
    pub async fn with_url(url: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(RedisCacheConfig::new(url)).await
    }

    fn open_blocking(&self) -> Result<Connection, DomainError> {
        let conn = self
            .client
            .get_connection_with_timeout(self.config.connection_timeout)
            .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))?;

        conn.set_read_timeout(Some(self.config.response_timeout))
            .and_then(|_| conn.set_write_timeout(Some(self.config.response_timeout)))
            .map_err(|e| DomainError::cache(format!("Failed to configure Redis connection: {}", e)))?;

        debug!("Opened blocking Redis connection");
        Ok(conn)
    }

    /// Runs `f` on the blocking connection, opening it if needed
    fn with_blocking<R>(
        &self,
        action: &str,
        key: &str,
        f: impl FnOnce(&mut Connection) -> redis::RedisResult<R>,
    ) -> Result<R, DomainError> {
        let mut slot = self.blocking.lock();

        if slot.is_none() {
            *slot = Some(self.open_blocking()?);
        }

        let Some(conn) = slot.as_mut() else {
            return Err(DomainError::internal("Blocking Redis connection unavailable"));
        };

        f(conn).map_err(|e| {
            if e.is_io_error() || e.is_connection_dropped() || e.is_timeout() {
                warn!(error = %e, "Dropping blocking Redis connection");
                *slot = None;
            }
            map_error(action, key, e)
        })
    }
}

impl BlockingCache for RedisCache {
    fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        self.with_blocking("get key", key, |conn| conn.get(key))
    }

    fn get_many_raw(&self, keys: &[String]) -> Result<Vec<Option<String>>, DomainError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        self.with_blocking("get keys", &keys.join(","), |conn| {
            redis::cmd("MGET").arg(keys).query(conn)
        })
    }

    fn set_raw(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), DomainError> {
        self.with_blocking("set key", key, |conn| {
            set_command(key, value, ttl).query::<()>(conn)
        })
    }

    fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let deleted: i64 = self.with_blocking("delete key", key, |conn| conn.del(key))?;
        Ok(deleted > 0)
    }

    fn delete_many(&self, keys: &[String]) -> Result<usize, DomainError> {
        if keys.is_empty() {
            return Ok(0);
        }

        let deleted: usize = self.with_blocking("delete keys", &keys.join(","), |conn| conn.del(keys))?;
        Ok(deleted)
    }

    fn exists(&self, key: &str) -> Result<bool, DomainError> {
        self.with_blocking("check existence of key", key, |conn| conn.exists(key))
    }

    fn search_keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        self.with_blocking("scan keys with pattern", pattern, |conn| {
            let mut cursor = 0u64;
            let mut found = Vec::new();

            loop {
                let (next, keys): (u64, Vec<String>) =
                    scan_command(cursor, pattern).query(&mut *conn)?;
                found.extend(keys);
                cursor = next;

                if cursor == 0 {
                    break;
                }
            }

            Ok(found)
        })
    }

    fn info(&self) -> Result<BTreeMap<String, String>, DomainError> {
        let raw: String = self.with_blocking("read", "INFO", |conn| redis::cmd("INFO").query(conn))?;
        Ok(parse_info(&raw))
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self.connection.clone();

        conn.get(key)
            .await
            .map_err(|e| map_error("get key", key, e))
    }

    async fn get_many_raw(&self, keys: &[String]) -> Result<Vec<Option<String>>, DomainError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.connection.clone();

        redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_error("get keys", &keys.join(","), e))
    }

    async fn set_raw(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        set_command(key, value, ttl)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| map_error("set key", key, e))
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        let deleted: i64 = conn
            .del(key)
            .await
            .map_err(|e| map_error("delete key", key, e))?;

        Ok(deleted > 0)
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize, DomainError> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection.clone();

        conn.del(keys)
            .await
            .map_err(|e| map_error("delete keys", &keys.join(","), e))
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        conn.exists(key)
            .await
            .map_err(|e| map_error("check existence of key", key, e))
    }

    async fn search_keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        let mut conn = self.connection.clone();

        // SCAN rather than KEYS so large keyspaces do not block the server
        let mut cursor = 0u64;
        let mut found = Vec::new();

        loop {
            let (next, keys): (u64, Vec<String>) = scan_command(cursor, pattern)
                .query_async(&mut conn)
                .await
                .map_err(|e| map_error("scan keys with pattern", pattern, e))?;

            found.extend(keys);
            cursor = next;

            if cursor == 0 {
                break;
            }
        }

        Ok(found)
    }

    async fn info(&self) -> Result<BTreeMap<String, String>, DomainError> {
        let mut conn = self.connection.clone();

        let raw: String = redis::cmd("INFO")
            .query_async(&mut conn)
            .await
            .map_err(|e| map_error("read", "INFO", e))?;

        Ok(parse_info(&raw))
    }
}
