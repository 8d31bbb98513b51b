//! Infrastructure layer - Store implementations and identity adapters

pub mod cache;
pub mod identity;
pub mod logging;
