//! # Snapshot Module
//!
//! The merged telemetry record and the mutex-guarded store that arbitrates
//! field-wise updates from the producer tasks.
//!
//! This module handles:
//! - The fixed-layout `Snapshot` record (one reading per sensor domain)
//! - Little-endian encoding/decoding of the record wire format
//! - The `SnapshotStore`, which merges per-domain updates under one lock

use bytes::{Buf, BufMut};
use std::sync::Mutex;

use crate::sensors::Reading;

/// Size of one encoded snapshot record in bytes
///
/// Layout (little-endian, no padding):
/// ```text
/// offset 0:  temperature  i16  (degC * 100)
/// offset 2:  humidity     i16  (%RH * 100)
/// offset 4:  pressure     i32  (Pa)
/// offset 8:  accel x,y,z  3 x i16 (m/s^2 * 100)
/// offset 14: gyro  x,y,z  3 x i16 (rad/s * 100)
/// ```
pub const RECORD_SIZE: usize = 20;

/// One merged telemetry record holding the latest known value from every
/// sensor domain.
///
/// Values are small fixed-point integers; the record size is constant and
/// known at compile time, which the persistent log relies on for its
/// wraparound arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Snapshot {
    /// Temperature in hundredths of a degree Celsius
    pub temperature: i16,

    /// Relative humidity in hundredths of a percent
    pub humidity: i16,

    /// Barometric pressure in pascals
    pub pressure: i32,

    /// Three-axis acceleration, hundredths of m/s^2
    pub accel: [i16; 3],

    /// Three-axis angular rate, hundredths of rad/s
    pub gyro: [i16; 3],
}

impl Snapshot {
    /// Encode the snapshot into its fixed little-endian wire layout
    ///
    /// # Returns
    ///
    /// * `[u8; RECORD_SIZE]` - Exactly 20 bytes, no padding
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        let mut cursor = &mut buf[..];

        cursor.put_i16_le(self.temperature);
        cursor.put_i16_le(self.humidity);
        cursor.put_i32_le(self.pressure);
        for axis in self.accel {
            cursor.put_i16_le(axis);
        }
        for axis in self.gyro {
            cursor.put_i16_le(axis);
        }

        buf
    }

    /// Decode a snapshot from its wire layout
    ///
    /// # Arguments
    ///
    /// * `bytes` - Exactly `RECORD_SIZE` bytes in the documented layout
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than `RECORD_SIZE`. Callers slice out of
    /// the fixed-size payload region, so the length is known up front.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        assert!(bytes.len() >= RECORD_SIZE, "record slice too short");
        let mut cursor = bytes;

        let temperature = cursor.get_i16_le();
        let humidity = cursor.get_i16_le();
        let pressure = cursor.get_i32_le();
        let accel = [
            cursor.get_i16_le(),
            cursor.get_i16_le(),
            cursor.get_i16_le(),
        ];
        let gyro = [
            cursor.get_i16_le(),
            cursor.get_i16_le(),
            cursor.get_i16_le(),
        ];

        Self {
            temperature,
            humidity,
            pressure,
            accel,
            gyro,
        }
    }
}

/// Mutex-guarded store for the merged snapshot
///
/// Each producer task owns write access to its own subset of fields; every
/// write goes through [`SnapshotStore::update`], which holds the lock for the
/// whole copy-modify-store sequence so a reader never observes a record with
/// a partially-written field.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: Mutex<Snapshot>,
}

impl SnapshotStore {
    /// Create a store with an all-zero initial snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one domain's reading into the snapshot
    ///
    /// Acquires the lock, copies the current snapshot, overwrites only the
    /// fields belonging to the reading's domain, stores the result, and
    /// returns the just-written merged copy. Must be called only by the
    /// producer task that owns the domain.
    ///
    /// # Arguments
    ///
    /// * `reading` - The new values for exactly one sensor domain
    ///
    /// # Returns
    ///
    /// * `Snapshot` - The merged record as it was stored
    pub fn update(&self, reading: Reading) -> Snapshot {
        let mut guard = self.current.lock().expect("snapshot lock poisoned");
        let mut merged = *guard;

        match reading {
            Reading::HumidityTemp {
                temperature,
                humidity,
            } => {
                merged.temperature = temperature;
                merged.humidity = humidity;
            }
            Reading::Pressure { pressure } => {
                merged.pressure = pressure;
            }
            Reading::Imu { accel, gyro } => {
                merged.accel = accel;
                merged.gyro = gyro;
            }
        }

        *guard = merged;
        merged
    }

    /// Read the current merged snapshot
    ///
    /// Returns a copy taken under the lock; later updates do not affect it.
    pub fn current(&self) -> Snapshot {
        *self.current.lock().expect("snapshot lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sample() -> Snapshot {
        Snapshot {
            temperature: 2315,
            humidity: 4780,
            pressure: 101_325,
            accel: [12, -980, 7],
            gyro: [-3, 0, 150],
        }
    }

    #[test]
    fn test_record_size_constant() {
        // 2 + 2 + 4 + 6 + 6 bytes
        assert_eq!(RECORD_SIZE, 20);
        assert_eq!(sample().to_bytes().len(), RECORD_SIZE);
    }

    #[test]
    fn test_encode_layout_is_exact() {
        let snapshot = Snapshot {
            temperature: 0x0102,
            humidity: 0x0304,
            pressure: 0x05060708,
            accel: [0x1112, 0x1314, 0x1516],
            gyro: [0x2122, 0x2324, 0x2526],
        };
        let bytes = snapshot.to_bytes();

        // Little-endian field order with no padding
        assert_eq!(&bytes[0..2], &[0x02, 0x01]);
        assert_eq!(&bytes[2..4], &[0x04, 0x03]);
        assert_eq!(&bytes[4..8], &[0x08, 0x07, 0x06, 0x05]);
        assert_eq!(&bytes[8..10], &[0x12, 0x11]);
        assert_eq!(&bytes[14..16], &[0x22, 0x21]);
        assert_eq!(&bytes[18..20], &[0x26, 0x25]);
    }

    #[test]
    fn test_decode_reverses_encode() {
        let snapshot = sample();
        assert_eq!(Snapshot::from_bytes(&snapshot.to_bytes()), snapshot);
    }

    #[test]
    fn test_decode_negative_values() {
        let snapshot = Snapshot {
            temperature: -1250,
            humidity: 0,
            pressure: -1,
            accel: [i16::MIN, 0, i16::MAX],
            gyro: [-1, -1, -1],
        };
        assert_eq!(Snapshot::from_bytes(&snapshot.to_bytes()), snapshot);
    }

    #[test]
    fn test_update_returns_merged_copy() {
        let store = SnapshotStore::new();
        let merged = store.update(Reading::Pressure { pressure: 99_000 });

        assert_eq!(merged.pressure, 99_000);
        assert_eq!(merged, store.current());
    }

    #[test]
    fn test_update_preserves_other_domains() {
        let store = SnapshotStore::new();
        store.update(Reading::HumidityTemp {
            temperature: 2100,
            humidity: 5500,
        });
        store.update(Reading::Imu {
            accel: [1, 2, 3],
            gyro: [4, 5, 6],
        });

        let merged = store.update(Reading::Pressure { pressure: 100_500 });

        // Pressure update must not disturb the other domains' fields
        assert_eq!(merged.temperature, 2100);
        assert_eq!(merged.humidity, 5500);
        assert_eq!(merged.accel, [1, 2, 3]);
        assert_eq!(merged.gyro, [4, 5, 6]);
        assert_eq!(merged.pressure, 100_500);
    }

    #[test]
    fn test_pushed_copy_is_independent_of_later_updates() {
        let store = SnapshotStore::new();
        let first = store.update(Reading::Pressure { pressure: 1000 });
        store.update(Reading::Pressure { pressure: 2000 });

        assert_eq!(first.pressure, 1000);
        assert_eq!(store.current().pressure, 2000);
    }

    #[test]
    fn test_concurrent_updates_never_tear_fields() {
        let store = Arc::new(SnapshotStore::new());
        let mut handles = Vec::new();

        // Each writer repeatedly stores a self-consistent pair; a torn read
        // would show a mix of two writers' values within one domain.
        for value in [1i16, 2, 3, 4] {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    store.update(Reading::HumidityTemp {
                        temperature: value,
                        humidity: value * 100,
                    });
                    let seen = store.current();
                    assert_eq!(
                        seen.humidity,
                        seen.temperature * 100,
                        "observed a partially-written humidity/temperature pair"
                    );
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
