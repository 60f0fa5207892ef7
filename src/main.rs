//! # Senlog
//!
//! Aggregates multi-sensor telemetry into a crash-recoverable circular log.
//!
//! Three producer tasks sample their sensor domains on fixed intervals,
//! merge readings into a shared snapshot, and hand copies to a bounded
//! drop-oldest queue. A single writer task drains the queue into the
//! persistent log. An operator shell on stdin can start/stop producers,
//! run one-shot fetches, and clear the log.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

mod config;
mod error;
mod log;
mod queue;
mod sensors;
mod shell;
mod snapshot;
mod tasks;

use config::Config;
use log::FlashLog;
use queue::SampleQueue;
use sensors::{sim, SensorDomain};
use snapshot::SnapshotStore;

/// Capacity of the writer control channel (operator commands only)
const WRITER_CONTROL_DEPTH: usize = 4;

/// Main entry point for senlog
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (optional path as the first argument)
///    - Open or initialize the persistent log; failure here is fatal
///
/// 2. **Steady state**
///    - One producer task per sensor domain, one log writer task
///    - Operator shell on stdin
///
/// 3. **Shutdown**
///    - Ctrl+C stops the process; the tasks themselves have no shutdown
///      protocol, and the log tolerates a torn stop the same way it
///      tolerates power loss
///
/// # Errors
///
/// Returns error if the configuration is invalid or the persistent log
/// cannot be opened or initialized at startup.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("senlog v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(Path::new(&path))
            .with_context(|| format!("failed to load config from {}", path))?,
        None => Config::default(),
    };

    // Open the log before spawning anything: open failure is the one fatal
    // error path in the system
    let flash_log = FlashLog::open_or_init(
        Path::new(&config.log.path),
        config.log.payload_capacity,
    )
    .with_context(|| format!("failed to open log at {}", config.log.path))?;

    let store = Arc::new(SnapshotStore::new());
    let sample_queue = Arc::new(SampleQueue::new(config.queue.capacity));
    let (writer_tx, writer_rx) = mpsc::channel(WRITER_CONTROL_DEPTH);

    tokio::spawn(tasks::run_writer(
        flash_log,
        Arc::clone(&sample_queue),
        config.backoff(),
        writer_rx,
    ));

    // The shell takes ownership of these handles so start/stop/status see
    // the real task set and no domain ever gets a second producer
    let mut producers = HashMap::new();
    for domain in SensorDomain::ALL {
        let handle = tokio::spawn(tasks::run_producer(
            sim::source_for(domain),
            Arc::clone(&store),
            Arc::clone(&sample_queue),
            config.interval_for(domain),
        ));
        producers.insert(domain, handle);
    }

    tokio::spawn(shell::run_shell(shell::ShellState::new(
        config.clone(),
        Arc::clone(&store),
        Arc::clone(&sample_queue),
        writer_tx,
        producers,
    )));

    info!("all tasks running; press Ctrl+C to exit");
    tokio::signal::ctrl_c().await?;
    info!("received Ctrl+C, shutting down");

    Ok(())
}
