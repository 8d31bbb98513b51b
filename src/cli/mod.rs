//! CLI module for the identity cache
//!
//! Operator subcommands against the configured store:
//! - `get`, `search`, `remove`: work on logical cache keys
//! - `tokens`, `revoke`: inspect and revoke refresh tokens
//! - `info`: backend information

pub mod info;
pub mod keys;
pub mod tokens;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::cache::{CacheFactory, CacheManager};
use crate::infrastructure::logging;

/// idcache - inspect and maintain the identity provider cache
#[derive(Parser)]
#[command(name = "idcache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Key prefix (overrides config)
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the JSON value stored under a key
    Get(keys::GetArgs),

    /// List keys matching a glob pattern
    Search(keys::SearchArgs),

    /// Delete a key
    Remove(keys::RemoveArgs),

    /// List the refresh tokens of a subject
    Tokens(tokens::TokensArgs),

    /// Revoke a subject's refresh tokens for one client
    Revoke(tokens::RevokeArgs),

    /// Print store information
    Info,
}

/// Loaded configuration plus a manager connected to the configured store
pub struct Context {
    pub config: AppConfig,
    pub manager: CacheManager,
}

impl Context {
    /// Loads configuration, initializes logging and connects to the store
    pub async fn init(prefix: Option<String>) -> anyhow::Result<Self> {
        let config = AppConfig::load().unwrap_or_default();
        logging::init_logging(&config.logging);

        let mut cache_config = config.cache_config();

        if let Some(prefix) = prefix {
            cache_config = cache_config.with_key_prefix(prefix);
        }

        let manager = CacheFactory::new().create_manager(&cache_config).await?;
        info!(
            backend = %cache_config.cache_type,
            prefix = manager.namespacer().prefix(),
            "Cache ready"
        );

        Ok(Self { config, manager })
    }
}

/// Runs a parsed command line
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::init(cli.prefix).await?;

    match cli.command {
        Command::Get(args) => keys::get(&ctx, args).await,
        Command::Search(args) => keys::search(&ctx, args).await,
        Command::Remove(args) => keys::remove(&ctx, args).await,
        Command::Tokens(args) => tokens::list(&ctx, args).await,
        Command::Revoke(args) => tokens::revoke(&ctx, args).await,
        Command::Info => info::run(&ctx).await,
    }
}
