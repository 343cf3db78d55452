//! Prometheus metrics for Signer-Watch.
//!
//! All metrics follow the naming convention: `sw_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // RPC TRANSPORT
    // =========================================================================

    /// Calls by method and outcome
    pub static ref RPC_CALLS: CounterVec = CounterVec::new(
        Opts::new("sw_rpc_calls_total", "JSON-RPC calls by method and outcome"),
        &["method", "outcome"]  // outcome: ok/remote_error/timeout/closed/connection_lost/decode_error
    ).expect("metric creation failed");

    /// Call latency
    pub static ref RPC_CALL_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "sw_rpc_call_duration_seconds",
            "Time from request write to response delivery"
        ).buckets(exponential_buckets(0.0005, 2.0, 16).expect("valid buckets"))
    ).expect("metric creation failed");

    /// Calls awaiting a response
    pub static ref RPC_PENDING_CALLS: Gauge = Gauge::new(
        "sw_rpc_pending_calls",
        "Number of calls registered and not yet resolved"
    ).expect("metric creation failed");

    /// Notifications forwarded to subscriptions
    pub static ref SUBSCRIPTION_EVENTS: Counter = Counter::new(
        "sw_subscription_events_total",
        "Subscription notifications forwarded by the receive loop"
    ).expect("metric creation failed");

    /// Notifications dropped because a consumer lagged
    pub static ref SUBSCRIPTION_LAGGED: Counter = Counter::new(
        "sw_subscription_lagged_total",
        "Subscription notifications overwritten before a slow consumer read them"
    ).expect("metric creation failed");

    // =========================================================================
    // CONSENSUS MONITOR
    // =========================================================================

    /// Header cache lookups
    pub static ref HEADER_CACHE_LOOKUPS: CounterVec = CounterVec::new(
        Opts::new("sw_header_cache_lookups_total", "Header cache lookups"),
        &["result"]  // result: hit/miss/bypass
    ).expect("metric creation failed");

    /// Blocks folded into the statistics
    pub static ref BLOCKS_PROCESSED: Counter = Counter::new(
        "sw_blocks_processed_total",
        "Blocks whose signers were added to the statistics"
    ).expect("metric creation failed");

    /// Statistics watermark
    pub static ref LAST_PROCESSED_BLOCK: Gauge = Gauge::new(
        "sw_last_processed_block",
        "Highest block number incorporated into the statistics"
    ).expect("metric creation failed");

    /// Seal recovery failures
    pub static ref SIGNER_RECOVERY_FAILURES: Counter = Counter::new(
        "sw_signer_recovery_failures_total",
        "Headers whose extra-data or seals could not be recovered"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Registering twice is harmless.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Transport
        Box::new(RPC_CALLS.clone()),
        Box::new(RPC_CALL_DURATION.clone()),
        Box::new(RPC_PENDING_CALLS.clone()),
        Box::new(SUBSCRIPTION_EVENTS.clone()),
        Box::new(SUBSCRIPTION_LAGGED.clone()),
        // Monitor
        Box::new(HEADER_CACHE_LOOKUPS.clone()),
        Box::new(BLOCKS_PROCESSED.clone()),
        Box::new(LAST_PROCESSED_BLOCK.clone()),
        Box::new(SIGNER_RECOVERY_FAILURES.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
