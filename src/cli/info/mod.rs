//! Info command - backend information

use super::Context;

pub async fn run(ctx: &Context) -> anyhow::Result<()> {
    println!("prefix: {}", ctx.manager.namespacer().prefix());
    println!("enabled: {}", ctx.manager.is_enabled());

    for (key, value) in ctx.manager.info_async().await? {
        println!("{}: {}", key, value);
    }

    Ok(())
}
