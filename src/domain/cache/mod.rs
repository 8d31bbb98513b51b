//! Cache domain - storage abstraction, key namespacing and glob patterns

mod key;
mod pattern;
mod repository;

pub use key::{namespace, KeyNamespacer, DEFAULT_KEY_PREFIX, KEY_SEPARATOR};
pub use pattern::{escape as escape_pattern, GlobPattern};
pub use repository::{BlockingCache, BlockingCacheExt, Cache, CacheExt, StoreHandle};

#[cfg(test)]
pub use repository::mock::MockCache;
