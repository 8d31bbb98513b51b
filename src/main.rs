use clap::Parser;
use identity_cache_redis::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    cli::run(Cli::parse()).await
}
