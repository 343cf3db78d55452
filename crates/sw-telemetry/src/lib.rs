//! # Signer-Watch Telemetry
//!
//! Structured logging through `tracing` and Prometheus metrics through a
//! process-wide registry.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sw_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `signer-watch` | Service name in the startup line |
//! | `SW_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `SW_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `SW_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `SW_NETWORK` | `redt` | Network label |

mod config;
mod logging;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, BLOCKS_PROCESSED, HEADER_CACHE_LOOKUPS,
    LAST_PROCESSED_BLOCK, RPC_CALLS, RPC_CALL_DURATION, RPC_PENDING_CALLS,
    SIGNER_RECOVERY_FAILURES, SUBSCRIPTION_EVENTS, SUBSCRIPTION_LAGGED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the tracing subscriber.
///
/// Returns a guard to be held for the lifetime of the application; dropping
/// it logs the final metric values.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    register_metrics()?;
    tracing_setup::init_tracing(&config)?;

    Ok(TelemetryGuard { config })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    config: TelemetryConfig,
}

impl TelemetryGuard {
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        match encode_metrics() {
            Ok(text) => tracing::info!(metrics = %text, "Shutting down telemetry"),
            Err(e) => tracing::warn!(error = %e, "Shutting down telemetry, metrics unavailable"),
        }
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
