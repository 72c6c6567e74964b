//! trackforge - legacy-compatible tracking event ingestion
//!
//! This application accepts tracking events over HTTP, rewrites them into the
//! legacy schema and writes them to the configured tracking logs.

use std::sync::Arc;

use trackforge::{config::Config, logging, Result, ShimRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment
    let config = Arc::new(Config::from_env()?);

    config.validate()?;

    logging::init_tracing(&config.server.log_level, &config.server.environment)?;

    config.log_config();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting trackforge");

    // Load the shims before the listener opens
    let registry = ShimRegistry::global();
    tracing::info!(shims = registry.len(), "Shim registry ready");

    trackforge::create_server(config).await?;

    tracing::info!("trackforge shutdown complete");
    Ok(())
}
