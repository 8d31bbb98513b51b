//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, CacheSection, LockKind, LogFormat, LoggingConfig, RedisConfig, TtlConfig,
};
