//! Token commands - list and revoke refresh tokens

use clap::Args;

use super::Context;
use crate::domain::identity::TokenStore;
use crate::infrastructure::identity::RefreshTokenStore;

#[derive(Args, Debug, Clone)]
pub struct TokensArgs {
    /// Subject (user) id
    pub subject: String,
}

#[derive(Args, Debug, Clone)]
pub struct RevokeArgs {
    /// Subject (user) id
    pub subject: String,

    /// Client id
    pub client: String,
}

fn refresh_tokens(ctx: &Context) -> RefreshTokenStore {
    let store = RefreshTokenStore::refresh_tokens(ctx.manager.clone());

    match ctx.config.ttl.refresh_token_cap() {
        Some(cap) => store.with_max_ttl(cap),
        None => store,
    }
}

/// Print a subject's refresh tokens as a JSON array
pub async fn list(ctx: &Context, args: TokensArgs) -> anyhow::Result<()> {
    let tokens = refresh_tokens(ctx).get_all(&args.subject).await?;
    println!("{}", serde_json::to_string_pretty(&tokens)?);
    Ok(())
}

pub async fn revoke(ctx: &Context, args: RevokeArgs) -> anyhow::Result<()> {
    refresh_tokens(ctx).revoke(&args.subject, &args.client).await?;
    println!(
        "Revoked refresh tokens of '{}' for client '{}'",
        args.subject, args.client
    );
    Ok(())
}
