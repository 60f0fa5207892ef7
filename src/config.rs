//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, SenlogError};
use crate::sensors::SensorDomain;
use crate::snapshot::RECORD_SIZE;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub sampling: SamplingConfig,
}

/// Persistent log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// Backing file for the circular log
    #[serde(default = "default_log_path")]
    pub path: String,

    /// Payload region size in bytes; must be a nonzero multiple of the
    /// record size
    #[serde(default = "default_payload_capacity")]
    pub payload_capacity: u32,

    /// Writer backoff after an append failure, in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

/// Bounded queue configuration
#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,
}

/// Per-domain sampling intervals
#[derive(Debug, Deserialize, Clone)]
pub struct SamplingConfig {
    /// Humidity/temperature sample interval in milliseconds
    #[serde(default = "default_hum_temp_interval_ms")]
    pub hum_temp_interval_ms: u64,

    /// Pressure sample interval in milliseconds
    #[serde(default = "default_pressure_interval_ms")]
    pub pressure_interval_ms: u64,

    /// IMU sample interval in milliseconds
    #[serde(default = "default_imu_interval_ms")]
    pub imu_interval_ms: u64,
}

fn default_log_path() -> String {
    "telemetry.log".to_string()
}

fn default_payload_capacity() -> u32 {
    // 512 record slots
    512 * RECORD_SIZE as u32
}

fn default_backoff_ms() -> u64 {
    1000
}

fn default_queue_capacity() -> usize {
    crate::queue::DEFAULT_QUEUE_CAPACITY
}

fn default_hum_temp_interval_ms() -> u64 {
    2000
}

fn default_pressure_interval_ms() -> u64 {
    3000
}

fn default_imu_interval_ms() -> u64 {
    4000
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            payload_capacity: default_payload_capacity(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_queue_capacity(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            hum_temp_interval_ms: default_hum_temp_interval_ms(),
            pressure_interval_ms: default_pressure_interval_ms(),
            imu_interval_ms: default_imu_interval_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log: LogConfig::default(),
            queue: QueueConfig::default(),
            sampling: SamplingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields fall back to their defaults; the loaded configuration
    /// is validated before being returned.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, the TOML is malformed, or
    /// validation fails.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| SenlogError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns `SenlogError::Config` if the queue capacity is zero, the
    /// payload capacity is not a nonzero multiple of the record size, or any
    /// interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.queue.capacity == 0 {
            return Err(SenlogError::Config(
                "queue.capacity must be nonzero".to_string(),
            ));
        }
        if self.log.payload_capacity == 0
            || self.log.payload_capacity as usize % RECORD_SIZE != 0
        {
            return Err(SenlogError::Config(format!(
                "log.payload_capacity must be a nonzero multiple of {} (got {})",
                RECORD_SIZE, self.log.payload_capacity
            )));
        }
        if self.log.backoff_ms == 0 {
            return Err(SenlogError::Config(
                "log.backoff_ms must be nonzero".to_string(),
            ));
        }
        if self.sampling.hum_temp_interval_ms == 0
            || self.sampling.pressure_interval_ms == 0
            || self.sampling.imu_interval_ms == 0
        {
            return Err(SenlogError::Config(
                "sampling intervals must be nonzero".to_string(),
            ));
        }
        Ok(())
    }

    /// Sample interval for one sensor domain
    pub fn interval_for(&self, domain: SensorDomain) -> Duration {
        let ms = match domain {
            SensorDomain::HumidityTemp => self.sampling.hum_temp_interval_ms,
            SensorDomain::Pressure => self.sampling.pressure_interval_ms,
            SensorDomain::Imu => self.sampling.imu_interval_ms,
        };
        Duration::from_millis(ms)
    }

    /// Writer backoff interval after an append failure
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.log.backoff_ms)
    }
}
