//! # Tasks Module
//!
//! The long-running units of concurrency: one producer task per sensor
//! domain and a single log writer task.
//!
//! Producers and the writer communicate only through the shared snapshot
//! store and the bounded sample queue. Producer-side errors never reach the
//! writer; log-side errors never block producers. None of the tasks define a
//! shutdown protocol; `main` owns their lifetime.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::SensorError;
use crate::log::FlashLog;
use crate::queue::SampleQueue;
use crate::sensors::SensorSource;
use crate::snapshot::SnapshotStore;

/// Control messages for the log writer task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterCommand {
    /// Reinitialize the log in place, discarding all records
    Clear,
}

/// Run one sample cycle: fetch, merge into the store, enqueue the copy
///
/// # Errors
///
/// Returns the fetch error unchanged; the snapshot and queue are untouched
/// in that case.
pub async fn producer_cycle(
    source: &mut dyn SensorSource,
    store: &SnapshotStore,
    queue: &SampleQueue,
) -> Result<(), SensorError> {
    let reading = source.fetch().await?;
    let merged = store.update(reading);
    if !queue.push_evicting(merged) {
        debug!("{}: sample dropped, queue still full after eviction", source.domain());
    }
    Ok(())
}

/// Producer task body for one sensor domain
///
/// Initializes the source; an init failure is fatal to this task only. In
/// steady state it runs one [`producer_cycle`] per interval; a failed fetch
/// skips the cycle (no snapshot update, no queue push) and the task
/// continues. Never terminates on fetch errors.
///
/// # Arguments
///
/// * `source` - The sensor device owned by this task
/// * `store` - Shared snapshot store
/// * `queue` - Sample queue handoff to the writer
/// * `interval` - Fixed per-domain sleep between cycles
pub async fn run_producer(
    mut source: Box<dyn SensorSource>,
    store: Arc<SnapshotStore>,
    queue: Arc<SampleQueue>,
    interval: Duration,
) {
    let domain = source.domain();

    if let Err(e) = source.init().await {
        error!("{} producer: sensor init failed, task exiting: {}", domain, e);
        return;
    }
    info!("{} producer started ({}ms interval)", domain, interval.as_millis());

    loop {
        if let Err(e) = producer_cycle(source.as_mut(), &store, &queue).await {
            warn!("{} producer: fetch failed, skipping cycle: {}", domain, e);
        }
        tokio::time::sleep(interval).await;
    }
}

/// Log writer task body: the queue's sole consumer
///
/// Loops forever popping snapshots and appending them to the log. An append
/// failure is logged and followed by a fixed backoff sleep; the task then
/// resumes and never terminates on I/O errors. Opening the log is the
/// caller's job, so the only fatal path (mount/open failure) is handled at
/// startup before this task exists.
///
/// # Arguments
///
/// * `log` - The opened circular log; this task is its only owner
/// * `queue` - Sample queue to drain
/// * `backoff` - Sleep after a failed append
/// * `control` - Operator commands (log clear)
pub async fn run_writer(
    mut log: FlashLog,
    queue: Arc<SampleQueue>,
    backoff: Duration,
    mut control: mpsc::Receiver<WriterCommand>,
) {
    info!(
        "log writer started ({} record slots, {}ms backoff)",
        log.slot_count(),
        backoff.as_millis()
    );

    loop {
        tokio::select! {
            Some(command) = control.recv() => match command {
                WriterCommand::Clear => match log.reset() {
                    Ok(()) => info!("log cleared"),
                    Err(e) => warn!("log clear failed: {}", e),
                },
            },
            snapshot = queue.pop_blocking() => {
                if let Err(e) = log.append(&snapshot) {
                    warn!(
                        "append failed, backing off {}ms: {}",
                        backoff.as_millis(),
                        e
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{LogHeader, FILL_BYTE, HEADER_SIZE, LOG_MAGIC};
    use crate::sensors::mocks::ScriptedSource;
    use crate::sensors::{Reading, SensorDomain};
    use crate::snapshot::{Snapshot, RECORD_SIZE};
    use std::path::Path;
    use tempfile::TempDir;

    const RECORD: u32 = RECORD_SIZE as u32;

    fn read_header(path: &Path) -> LogHeader {
        let bytes = std::fs::read(path).unwrap();
        let mut header = [0u8; HEADER_SIZE];
        header.copy_from_slice(&bytes[..HEADER_SIZE]);
        LogHeader::from_bytes(&header)
    }

    #[tokio::test]
    async fn test_producer_cycle_merges_and_enqueues() {
        let store = SnapshotStore::new();
        let queue = SampleQueue::new(8);
        let mut source = ScriptedSource::new(
            SensorDomain::Pressure,
            vec![Ok(Reading::Pressure { pressure: 98_000 })],
        );

        producer_cycle(&mut source, &store, &queue).await.unwrap();

        assert_eq!(store.current().pressure, 98_000);
        assert_eq!(queue.try_pop().unwrap().pressure, 98_000);
    }

    #[tokio::test]
    async fn test_producer_cycle_fetch_failure_touches_nothing() {
        let store = SnapshotStore::new();
        let queue = SampleQueue::new(8);
        store.update(Reading::Pressure { pressure: 1234 });
        let mut source = ScriptedSource::new(SensorDomain::Pressure, vec![]);

        let result = producer_cycle(&mut source, &store, &queue).await;

        assert!(result.is_err());
        assert_eq!(store.current().pressure, 1234);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_producer_task_exits_when_device_not_ready() {
        let store = Arc::new(SnapshotStore::new());
        let queue = Arc::new(SampleQueue::new(8));
        let source = Box::new(ScriptedSource::not_ready(SensorDomain::Imu));

        let handle = tokio::spawn(run_producer(
            source,
            Arc::clone(&store),
            Arc::clone(&queue),
            Duration::from_millis(1),
        ));

        // Fatal init: the task returns instead of looping
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("producer task did not exit")
            .unwrap();
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_end_to_end_three_producers_one_writer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("telemetry.log");
        let store = SnapshotStore::new();
        let queue = SampleQueue::new(8);
        let mut log = FlashLog::open_or_init(&path, 8 * RECORD).unwrap();

        let mut sources: Vec<ScriptedSource> = vec![
            ScriptedSource::new(
                SensorDomain::HumidityTemp,
                vec![Ok(Reading::HumidityTemp {
                    temperature: 2200,
                    humidity: 4800,
                })],
            ),
            ScriptedSource::new(
                SensorDomain::Pressure,
                vec![Ok(Reading::Pressure { pressure: 101_325 })],
            ),
            ScriptedSource::new(
                SensorDomain::Imu,
                vec![Ok(Reading::Imu {
                    accel: [1, 2, 3],
                    gyro: [4, 5, 6],
                })],
            ),
        ];

        // All three producers emit one reading before the consumer drains
        for source in &mut sources {
            producer_cycle(source, &store, &queue).await.unwrap();
        }
        assert_eq!(queue.len(), 3);

        // The consumer pops in push order and appends at consecutive offsets
        for _ in 0..3 {
            let snapshot = queue.pop_blocking().await;
            log.append(&snapshot).unwrap();
        }

        let header = read_header(&path);
        assert_eq!(header.magic, LOG_MAGIC);
        assert_eq!(header.write_offset, 3 * RECORD);

        // Record 0 carries only the first domain; record 2 carries the merge
        // of all three
        let bytes = std::fs::read(&path).unwrap();
        let first = Snapshot::from_bytes(&bytes[HEADER_SIZE..HEADER_SIZE + RECORD_SIZE]);
        assert_eq!(first.temperature, 2200);
        assert_eq!(first.pressure, 0);

        let third = Snapshot::from_bytes(
            &bytes[HEADER_SIZE + 2 * RECORD_SIZE..HEADER_SIZE + 3 * RECORD_SIZE],
        );
        assert_eq!(third.temperature, 2200);
        assert_eq!(third.pressure, 101_325);
        assert_eq!(third.accel, [1, 2, 3]);
    }

    #[tokio::test]
    async fn test_writer_task_appends_and_clears() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("telemetry.log");
        let queue = Arc::new(SampleQueue::new(8));
        let log = FlashLog::open_or_init(&path, 8 * RECORD).unwrap();
        let (tx, rx) = mpsc::channel(4);

        let writer = tokio::spawn(run_writer(
            log,
            Arc::clone(&queue),
            Duration::from_millis(10),
            rx,
        ));

        queue
            .try_push(Snapshot {
                pressure: 77,
                ..Snapshot::default()
            })
            .unwrap();

        // Wait for the writer to drain the queue and persist the record
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while read_header(&path).write_offset != RECORD {
            assert!(tokio::time::Instant::now() < deadline, "writer never appended");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        tx.send(WriterCommand::Clear).await.unwrap();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while read_header(&path).write_offset != 0 {
            assert!(tokio::time::Instant::now() < deadline, "writer never cleared");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes[HEADER_SIZE..].iter().all(|&b| b == FILL_BYTE));

        writer.abort();
    }
}
