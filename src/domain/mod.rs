//! Domain layer - Core entities and contracts

pub mod cache;
pub mod error;
pub mod identity;

pub use cache::{
    BlockingCache, BlockingCacheExt, Cache, CacheExt, GlobPattern, KeyNamespacer, StoreHandle,
};
pub use error::DomainError;
pub use identity::{
    AuthorizationCode, Claim, Client, ItemCache, RefreshToken, Scope, TokenMetadata, TokenStore,
};
