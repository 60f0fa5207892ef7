//! Deterministic simulated sensor sources.
//!
//! The real system reads an HTS221, an LPS22HB, and an LSM6DSL; driver logic
//! is outside this crate's scope, so the binary runs on these simulated
//! devices instead. Each source produces a slow deterministic walk around a
//! plausible baseline, which keeps one-shot fetches and log contents easy to
//! eyeball.

use async_trait::async_trait;

use super::{Reading, SensorDomain, SensorSource};
use crate::error::SensorError;

/// Simulated humidity/temperature device
#[derive(Debug, Default)]
pub struct SimHumidityTemp {
    ticks: u32,
}

#[async_trait]
impl SensorSource for SimHumidityTemp {
    fn domain(&self) -> SensorDomain {
        SensorDomain::HumidityTemp
    }

    async fn init(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    async fn fetch(&mut self) -> Result<Reading, SensorError> {
        self.ticks = self.ticks.wrapping_add(1);
        let wobble = (self.ticks % 16) as i16;
        Ok(Reading::HumidityTemp {
            temperature: 2200 + wobble * 5,
            humidity: 4500 + wobble * 10,
        })
    }
}

/// Simulated barometric pressure device
#[derive(Debug, Default)]
pub struct SimPressure {
    ticks: u32,
}

#[async_trait]
impl SensorSource for SimPressure {
    fn domain(&self) -> SensorDomain {
        SensorDomain::Pressure
    }

    async fn init(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    async fn fetch(&mut self) -> Result<Reading, SensorError> {
        self.ticks = self.ticks.wrapping_add(1);
        let wobble = (self.ticks % 32) as i32;
        Ok(Reading::Pressure {
            pressure: 101_325 + wobble * 3,
        })
    }
}

/// Simulated 6-axis IMU
#[derive(Debug, Default)]
pub struct SimImu {
    ticks: u32,
}

#[async_trait]
impl SensorSource for SimImu {
    fn domain(&self) -> SensorDomain {
        SensorDomain::Imu
    }

    async fn init(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    async fn fetch(&mut self) -> Result<Reading, SensorError> {
        self.ticks = self.ticks.wrapping_add(1);
        let wobble = (self.ticks % 8) as i16;
        Ok(Reading::Imu {
            // Gravity on z, small noise elsewhere
            accel: [wobble, -wobble, 981 + wobble],
            gyro: [wobble * 2, 0, -wobble],
        })
    }
}

/// Build a fresh simulated source for a domain
///
/// Used by the binary to wire up producer tasks and by the shell's one-shot
/// fetch command, which reads the devices directly.
pub fn source_for(domain: SensorDomain) -> Box<dyn SensorSource> {
    match domain {
        SensorDomain::HumidityTemp => Box::new(SimHumidityTemp::default()),
        SensorDomain::Pressure => Box::new(SimPressure::default()),
        SensorDomain::Imu => Box::new(SimImu::default()),
    }
}
