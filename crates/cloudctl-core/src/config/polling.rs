//! Polling configuration for long-running operations
//!
//! Stored under `[polling]` in the config file. Every field has a serde
//! default so a partial table is valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long-running operations are awaited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between status fetches, in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Ceiling on the total time spent waiting for one operation, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Consecutive transport failures tolerated while polling
    #[serde(default = "default_transport_retries")]
    pub transport_retries: u32,

    /// Initial backoff after a transport failure, in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Maximum backoff in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_secs: default_timeout_secs(),
            transport_retries: default_transport_retries(),
            backoff_ms: default_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Backoff to apply after the `attempt`-th consecutive transport failure
    /// (1-based). Doubles each time, capped at `max_backoff_ms`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        let ms = self.backoff_ms.saturating_mul(factor).min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    /// Apply command-line overrides on top of the configured values
    pub fn with_overrides(mut self, timeout_secs: Option<u64>, interval_secs: Option<u64>) -> Self {
        if let Some(timeout) = timeout_secs {
            self.timeout_secs = timeout;
        }
        if let Some(interval) = interval_secs {
            self.interval_ms = interval.saturating_mul(1000);
        }
        self
    }
}

// Default value functions for serde
fn default_interval_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_transport_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PollConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(1));
        assert_eq!(config.timeout(), Duration::from_secs(600));
        assert_eq!(config.transport_retries, 3);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = PollConfig::default();
        assert_eq!(config.backoff(1), Duration::from_millis(100));
        assert_eq!(config.backoff(2), Duration::from_millis(200));
        assert_eq!(config.backoff(3), Duration::from_millis(400));
        assert_eq!(config.backoff(10), Duration::from_millis(5000));
        assert_eq!(config.backoff(200), Duration::from_millis(5000));
    }

    #[test]
    fn test_partial_table_uses_defaults() {
        let config: PollConfig = toml::from_str("timeout_secs = 30").unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.interval_ms, 1000);
        assert_eq!(config.max_backoff_ms, 5000);
    }

    #[test]
    fn test_cli_overrides() {
        let config = PollConfig::default().with_overrides(Some(60), Some(5));
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.interval(), Duration::from_secs(5));

        let untouched = PollConfig::default().with_overrides(None, None);
        assert_eq!(untouched, PollConfig::default());
    }
}
