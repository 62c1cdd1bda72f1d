//! Pool and schedule configuration.
//!
//! The pool count and interval cap only change how fast the schedule
//! reaches its later pools; the tripling growth and base-3 activation
//! pattern are the same for any values.

use crate::conditioning::{HashAlgorithm, MAX_POOLS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the pool bank and reseed schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReseedConfig {
    /// Number of pools in the bank.
    pub pool_count: usize,
    /// Longest interval between scheduled reseeds, in seconds.
    pub interval_cap_secs: u32,
    /// Delay between the first keying and the first scheduled reseed.
    pub first_reseed_delay_ms: u64,
    /// Hash algorithm for pool accumulation.
    pub algorithm: HashAlgorithm,
}

impl Default for ReseedConfig {
    fn default() -> Self {
        Self {
            pool_count: 16,
            interval_cap_secs: 3600, // 1 hour
            first_reseed_delay_ms: 1000,
            algorithm: HashAlgorithm::Blake3,
        }
    }
}

impl ReseedConfig {
    /// Creates a configuration with the given pool count and interval cap.
    pub fn with_schedule(pool_count: usize, interval_cap_secs: u32) -> Self {
        Self {
            pool_count,
            interval_cap_secs,
            ..Default::default()
        }
    }

    /// Delay before the first scheduled reseed.
    pub fn first_reseed_delay(&self) -> Duration {
        Duration::from_millis(self.first_reseed_delay_ms)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_count == 0 || self.pool_count > MAX_POOLS {
            return Err(ConfigError::InvalidPoolCount(self.pool_count));
        }
        if self.interval_cap_secs == 0 {
            return Err(ConfigError::InvalidIntervalCap);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Pool count outside the supported range.
    #[error("invalid pool count {0} (must be 1-32)")]
    InvalidPoolCount(usize),
    /// Interval cap of zero.
    #[error("interval cap must be at least one second")]
    InvalidIntervalCap,
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The file is not valid TOML for this format.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Pool and schedule settings.
    #[serde(default)]
    pub reseed: ReseedConfig,
    /// Metrics exporter settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Simulation settings for the CLI.
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Metrics server port (0 to disable).
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { port: 9090 }
    }
}

/// Settings for the simulation binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Sources to simulate, by name.
    pub sources: Vec<String>,
    /// Events to harvest before drawing output.
    pub events: u32,
    /// Scheduler rounds to drive synchronously.
    pub ticks: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                "interrupt".to_string(),
                "net_ether".to_string(),
                "keyboard".to_string(),
                "rdrand".to_string(),
            ],
            events: 1000,
            ticks: 12,
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.reseed.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ReseedConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.first_reseed_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_pools_invalid() {
        let config = ReseedConfig::with_schedule(0, 3600);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPoolCount(0))
        ));
    }

    #[test]
    fn test_too_many_pools_invalid() {
        let config = ReseedConfig::with_schedule(MAX_POOLS + 1, 3600);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = FileConfig::from_toml(
            r#"
            [reseed]
            pool_count = 4
            algorithm = "sha256"

            [metrics]
            port = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.reseed.pool_count, 4);
        assert_eq!(config.reseed.interval_cap_secs, 3600);
        assert_eq!(config.reseed.algorithm, HashAlgorithm::Sha256);
        assert_eq!(config.metrics.port, 0);
        assert_eq!(config.demo.events, 1000);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let result = FileConfig::from_toml("[reseed]\ninterval_cap_secs = 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidIntervalCap)));

        let result = FileConfig::from_toml("[reseed\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
