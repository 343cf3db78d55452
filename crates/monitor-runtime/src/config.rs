//! Runtime configuration from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use sw_01_rpc_transport::TransportConfig;
use sw_02_consensus_monitor::MonitorConfig;
use thiserror::Error;

pub const DEFAULT_NODE_URL: &str = "ws://127.0.0.1:22001";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// How new blocks are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowMode {
    /// `eth_subscribe("newHeads")`
    Subscribe,
    /// Poll the head every `poll_interval`
    Poll,
}

impl FromStr for FollowMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subscribe" | "ws" => Ok(FollowMode::Subscribe),
            "poll" => Ok(FollowMode::Poll),
            other => Err(other.to_string()),
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub transport: TransportConfig,
    pub monitor: MonitorConfig,
    /// Blocks replayed into the statistics at startup
    pub stats_window: u64,
    pub mode: FollowMode,
    pub poll_interval: Duration,
    /// JSON registry of `{operator, enode}` entries; the bundled RedT list
    /// is used when unset
    pub validators_file: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::for_url(DEFAULT_NODE_URL),
            monitor: MonitorConfig::default(),
            stats_window: 100,
            mode: FollowMode::Subscribe,
            poll_interval: Duration::from_secs(2),
            validators_file: None,
        }
    }
}

impl RuntimeConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` for variable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        config.transport = TransportConfig::from_lookup(&lookup);

        if let Some(value) = lookup("SW_STATS_WINDOW") {
            config.stats_window = parse("SW_STATS_WINDOW", &value)?;
        }
        if let Some(value) = lookup("SW_MODE") {
            config.mode = parse("SW_MODE", &value)?;
        }
        if let Some(value) = lookup("SW_POLL_INTERVAL_SECS") {
            let secs: u64 = parse("SW_POLL_INTERVAL_SECS", &value)?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    var: "SW_POLL_INTERVAL_SECS",
                    value,
                });
            }
            config.poll_interval = Duration::from_secs(secs);
        }
        config.validators_file = lookup("SW_VALIDATORS_FILE")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Ok(config)
    }
}

fn parse<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}
