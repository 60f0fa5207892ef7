//! # Error Types
//!
//! Custom error types for senlog using `thiserror`.
//!
//! Each component gets its own tagged error enum so that a failure carries
//! which subsystem it belongs to and how the caller is expected to react:
//! sensor errors stay inside their producer task, queue overflow triggers the
//! drop-oldest policy, and log errors are retried by the writer task.

use thiserror::Error;

/// Errors produced at the sensor source boundary
#[derive(Debug, Error)]
pub enum SensorError {
    /// The underlying device never became ready. Fatal to the producer task
    /// that owns the device, but to that task only.
    #[error("sensor device not ready: {0}")]
    DeviceNotReady(String),

    /// A single sample could not be fetched. Transient: the producer skips
    /// the current cycle and tries again next interval.
    #[error("sensor fetch failed: {0}")]
    Fetch(String),
}

/// The bounded queue rejected a push because it is at capacity
#[derive(Debug, Error, PartialEq, Eq)]
#[error("sample queue is full")]
pub struct QueueFull;

/// Errors produced by the persistent circular log
#[derive(Debug, Error)]
pub enum LogError {
    /// The on-disk header failed validation (bad magic, or a write offset
    /// outside the payload region). Handled by full reinitialization.
    #[error("log header invalid: {0}")]
    HeaderInvalid(String),

    /// Seek/read/write failure on the backing file. The writer task logs
    /// and backs off; it never terminates on this.
    #[error("log I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error type for senlog
///
/// Sensor and log errors never appear here: the containment policy keeps
/// them inside their owning tasks, so only startup-time failures reach the
/// binary boundary.
#[derive(Debug, Error)]
pub enum SenlogError {
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O errors outside the log subsystem
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for senlog
pub type Result<T> = std::result::Result<T, SenlogError>;
