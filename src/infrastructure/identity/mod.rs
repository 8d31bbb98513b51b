//! Identity provider cache adapters

mod store_cache;
mod token_store;

pub use store_cache::{
    ClientStoreCache, ScopeStoreCache, StoreCache, TtlPolicy, UserClaimsCache, CLAIMS_TTL,
    CLIENT_TTL, SCOPE_TTL,
};
pub use token_store::{
    AuthorizationCodeStore, CachedTokenStore, RefreshTokenStore, AUTHORIZATION_CODE_SEGMENT,
    REFRESH_TOKEN_SEGMENT,
};
