//! Beeline node binary.

use anyhow::Result;
use node_runtime::{load_config, NodeRuntime};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = load_config();
    let mut runtime = NodeRuntime::new(config)?;
    runtime.start().await?;

    info!("node is running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
