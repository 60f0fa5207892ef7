//! # Sensors Module
//!
//! The sensor source boundary: domains, typed readings, and the async
//! `SensorSource` trait that producer tasks drive.
//!
//! This module handles:
//! - The three sensor domains (humidity/temperature, pressure, inertial)
//! - Typed fixed-point readings per domain
//! - The trait seam that lets tests substitute scripted sources
//! - Deterministic simulated sources for running without hardware

pub mod sim;

use async_trait::async_trait;

use crate::error::SensorError;

/// The independent sensor domains feeding the merged snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorDomain {
    /// Combined humidity/temperature device (e.g. HTS221)
    HumidityTemp,

    /// Barometric pressure device (e.g. LPS22HB)
    Pressure,

    /// 6-axis inertial measurement unit (e.g. LSM6DSL)
    Imu,
}

impl SensorDomain {
    /// All domains, in producer spawn order
    pub const ALL: [SensorDomain; 3] = [
        SensorDomain::HumidityTemp,
        SensorDomain::Pressure,
        SensorDomain::Imu,
    ];

    /// Short lowercase name used in logs and shell commands
    pub fn name(&self) -> &'static str {
        match self {
            SensorDomain::HumidityTemp => "hum_temp",
            SensorDomain::Pressure => "pressure",
            SensorDomain::Imu => "imu",
        }
    }

    /// Parse a shell-command domain name
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "hum_temp" => Some(SensorDomain::HumidityTemp),
            "pressure" => Some(SensorDomain::Pressure),
            "imu" => Some(SensorDomain::Imu),
            _ => None,
        }
    }
}

impl std::fmt::Display for SensorDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One typed reading from a single sensor domain
///
/// Values use the same fixed-point conventions as [`crate::snapshot::Snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    /// Humidity/temperature sample
    HumidityTemp {
        /// Temperature in hundredths of a degree Celsius
        temperature: i16,
        /// Relative humidity in hundredths of a percent
        humidity: i16,
    },

    /// Barometric pressure sample
    Pressure {
        /// Pressure in pascals
        pressure: i32,
    },

    /// Inertial sample
    Imu {
        /// Three-axis acceleration, hundredths of m/s^2
        accel: [i16; 3],
        /// Three-axis angular rate, hundredths of rad/s
        gyro: [i16; 3],
    },
}

impl Reading {
    /// The domain this reading belongs to
    pub fn domain(&self) -> SensorDomain {
        match self {
            Reading::HumidityTemp { .. } => SensorDomain::HumidityTemp,
            Reading::Pressure { .. } => SensorDomain::Pressure,
            Reading::Imu { .. } => SensorDomain::Imu,
        }
    }
}

/// Format a hundredths fixed-point value as a decimal string
///
/// The sign is printed explicitly: `value / 100` is zero for values in
/// (-100, 0), so relying on integer division would drop the minus sign.
fn format_centi(value: i16) -> String {
    let sign = if value < 0 { "-" } else { "" };
    format!(
        "{}{}.{:02}",
        sign,
        (value / 100).abs(),
        (value % 100).unsigned_abs()
    )
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reading::HumidityTemp {
                temperature,
                humidity,
            } => write!(
                f,
                "temperature: {} C, humidity: {} %",
                format_centi(*temperature),
                format_centi(*humidity)
            ),
            Reading::Pressure { pressure } => write!(f, "pressure: {} Pa", pressure),
            Reading::Imu { accel, gyro } => write!(
                f,
                "accel: [{}, {}, {}], gyro: [{}, {}, {}]",
                accel[0], accel[1], accel[2], gyro[0], gyro[1], gyro[2]
            ),
        }
    }
}

/// Trait for sensor source implementations
///
/// One instance per domain, owned by the producer task that drives it.
/// `init` is called once at task startup; `fetch` once per sample cycle.
#[async_trait]
pub trait SensorSource: Send {
    /// The domain this source produces readings for
    fn domain(&self) -> SensorDomain;

    /// Bring the device up
    ///
    /// # Errors
    ///
    /// Returns `SensorError::DeviceNotReady` if the device cannot be used at
    /// all; the owning producer task treats this as fatal.
    async fn init(&mut self) -> Result<(), SensorError>;

    /// Fetch one reading
    ///
    /// # Errors
    ///
    /// Returns `SensorError::Fetch` on a transient sampling failure; the
    /// producer task skips the cycle and retries next interval.
    async fn fetch(&mut self) -> Result<Reading, SensorError>;
}
