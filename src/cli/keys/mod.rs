//! Key commands - get, search and remove logical keys

use clap::Args;

use super::Context;
use crate::domain::DomainError;

#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    /// Logical cache key
    pub key: String,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Glob pattern (`*`, `?`, `[...]`)
    pub pattern: String,
}

#[derive(Args, Debug, Clone)]
pub struct RemoveArgs {
    /// Logical cache keys
    #[arg(required = true)]
    pub keys: Vec<String>,
}

/// Print the value of a key as pretty JSON
pub async fn get(ctx: &Context, args: GetArgs) -> anyhow::Result<()> {
    let value: serde_json::Value = ctx
        .manager
        .get_async(&args.key)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Key '{}' not found", args.key)))?;

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

pub async fn search(ctx: &Context, args: SearchArgs) -> anyhow::Result<()> {
    let mut keys = ctx.manager.search_keys_async(&args.pattern).await?;
    keys.sort();

    for key in &keys {
        println!("{}", key);
    }

    Ok(())
}

pub async fn remove(ctx: &Context, args: RemoveArgs) -> anyhow::Result<()> {
    let removed = ctx.manager.remove_all_async(&args.keys).await?;
    println!("Removed {} of {} key(s)", removed, args.keys.len());
    Ok(())
}
