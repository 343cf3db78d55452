//! Monitor configuration.

use super::MonitorError;
use std::time::Duration;

/// Consensus monitor configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Headers kept in the LRU cache
    pub cache_capacity: usize,
    /// Timeout for node queries issued by the monitor
    pub fetch_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 100,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl MonitorConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.cache_capacity == 0 {
            return Err(MonitorError::InvalidConfig(
                "cache_capacity cannot be 0".into(),
            ));
        }
        if self.fetch_timeout.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "fetch_timeout cannot be 0".into(),
            ));
        }
        Ok(())
    }
}
