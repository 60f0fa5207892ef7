//! # Senlog Library
//!
//! Aggregate readings from independent sensor sources and persist them to a
//! fixed-capacity, crash-recoverable circular log.
//!
//! This library provides the core pipeline: per-domain producer tasks merge
//! readings into a mutex-guarded snapshot, copies flow through a bounded
//! drop-oldest queue, and a single writer task appends them to a
//! flash-style wraparound log with a recoverable header.

pub mod config;
pub mod error;
pub mod log;
pub mod queue;
pub mod sensors;
pub mod shell;
pub mod snapshot;
pub mod tasks;
