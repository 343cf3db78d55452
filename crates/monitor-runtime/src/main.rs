//! # Signer-Watch
//!
//! Follows block production on an Istanbul BFT network and logs, for every
//! block, who proposed it, who endorsed it and who should propose next.
//!
//! Configuration comes from the environment; see [`RuntimeConfig`] and
//! `sw_telemetry::TelemetryConfig`.

use anyhow::{Context, Result};
use monitor_runtime::{MonitorRuntime, RuntimeConfig};
use sw_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry_config = TelemetryConfig::from_env();
    let service = telemetry_config.service_name.clone();
    let network = telemetry_config.network.clone();
    let _telemetry = init_telemetry(telemetry_config).context("Failed to initialize telemetry")?;

    let config = RuntimeConfig::from_env().context("Invalid configuration")?;
    info!(
        service = %service,
        network = %network,
        url = %config.transport.url,
        mode = ?config.mode,
        window = config.stats_window,
        "Starting signer-watch"
    );

    let runtime = MonitorRuntime::connect(config).await?;

    let outcome = tokio::select! {
        result = runtime.run() => result,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Shutdown signal received");
            Ok(())
        }
    };

    runtime.close().await;
    if let Err(e) = &outcome {
        error!(error = %format!("{:#}", e), "Monitor stopped");
    }
    outcome
}
