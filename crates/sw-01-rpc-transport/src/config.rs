//! Transport configuration.

use crate::error::TransportError;
use std::env;
use std::time::Duration;

/// Process-wide default timeout for calls that do not pass their own.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(1);

/// Session and client configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// WebSocket endpoint (`ws://` or `wss://`)
    pub url: String,
    /// Timeout used by `RpcClient::call`
    pub default_timeout: Duration,
    /// Dial and handshake timeout
    pub connect_timeout: Duration,
    /// Events retained per subscription before the oldest is overwritten
    pub subscription_buffer: usize,
    /// Frames queued for the writer task
    pub outbound_buffer: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:22001".to_string(),
            default_timeout: DEFAULT_CALL_TIMEOUT,
            connect_timeout: Duration::from_secs(10),
            subscription_buffer: 256,
            outbound_buffer: 100,
        }
    }
}

impl TransportConfig {
    /// Default configuration for the given endpoint.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// - `SW_NODE_URL`: endpoint (default: ws://127.0.0.1:22001)
    /// - `SW_RPC_TIMEOUT_MS`: default call timeout (default: 1000)
    /// - `SW_SUBSCRIPTION_BUFFER`: per-subscription buffer (default: 256)
    pub fn from_env() -> Self {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    /// Unparsable values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            url: lookup("SW_NODE_URL").unwrap_or(defaults.url),
            default_timeout: lookup("SW_RPC_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.default_timeout),
            subscription_buffer: lookup("SW_SUBSCRIPTION_BUFFER")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.subscription_buffer),
            ..defaults
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), TransportError> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(TransportError::InvalidConfig(format!(
                "url must use ws:// or wss://, got {}",
                self.url
            )));
        }
        if self.default_timeout.is_zero() {
            return Err(TransportError::InvalidConfig(
                "default_timeout cannot be 0".into(),
            ));
        }
        if self.subscription_buffer == 0 {
            return Err(TransportError::InvalidConfig(
                "subscription_buffer cannot be 0".into(),
            ));
        }
        if self.outbound_buffer == 0 {
            return Err(TransportError::InvalidConfig(
                "outbound_buffer cannot be 0".into(),
            ));
        }
        Ok(())
    }
}
