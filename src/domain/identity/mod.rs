//! Identity provider domain - cached models and cache contracts

mod claim;
mod client;
mod scope;
mod store;
mod token;

pub use claim::{Claim, LOCAL_AUTHORITY, STRING_VALUE_TYPE};
pub use client::Client;
pub use scope::{Scope, ScopeClaim, ScopeType};
pub use store::{ItemCache, TokenStore};
pub use token::{AuthorizationCode, RefreshToken, TokenMetadata};
