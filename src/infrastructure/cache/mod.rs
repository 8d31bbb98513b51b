//! Cache infrastructure - backing stores, key locks and the cache manager

mod clock;
mod factory;
mod in_memory;
mod lock;
mod manager;
mod redis;

pub use clock::{Clock, ManualClock, SystemClock};
pub use factory::{CacheConfig, CacheFactory, CacheType};
pub use in_memory::{InMemoryCache, InMemoryCacheConfig};
pub use lock::{KeyLockRegistry, LockStrategy, DEFAULT_LOCK_STRIPES};
pub use manager::{CacheManager, CacheSettings, DEFAULT_TTL};
pub use redis::{RedisCache, RedisCacheConfig};
