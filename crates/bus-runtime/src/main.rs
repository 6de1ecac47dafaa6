//! # Queue Bus Host
//!
//! Runs one bus process: loads the configuration, composes the topology,
//! deploys its queues and consumes until Ctrl+C.
//!
//! ```text
//! bus-host [config.toml]      (or QB_CONFIG=config.toml bus-host)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bus_runtime::{compose, BusBuilder};
use bus_telemetry::{init_telemetry, TelemetryConfig};
use qb_01_configuration::{ConfigurationSource, TomlConfigLoader};
use shared_bus::{InMemorySubscriptionStorage, InMemoryTransport};
use tracing::info;

const CONFIG_ENV: &str = "QB_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "queue-bus.toml";

fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
        .into()
}

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    let metrics = init_telemetry(&telemetry).context("failed to initialise telemetry")?;

    let path = config_path();
    let config = TomlConfigLoader::new(&path)
        .load()
        .with_context(|| format!("invalid configuration in {}", path.display()))?;

    info!("===========================================");
    info!("  Queue Bus Host v{}", env!("CARGO_PKG_VERSION"));
    info!("  Endpoint: {}", config.endpoint);
    info!("===========================================");

    let builder = BusBuilder::new(
        config,
        Arc::new(InMemoryTransport::new()),
        Arc::new(InMemorySubscriptionStorage::new()),
    );
    let topology = compose(&builder).context("composition failed")?;
    topology.deploy().await.context("deployment failed")?;
    topology.start().await;

    info!("Bus is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    topology.shutdown().await;
    if let Ok(report) = metrics.gather() {
        info!(metrics = %report, "Final metrics");
    }
    Ok(())
}
