//! # Sample Queue Module
//!
//! Bounded multi-producer/single-consumer queue of snapshot copies.
//!
//! This is the sole handoff point between the producer tasks and the log
//! writer. Capacity is fixed at construction; when a push finds the queue
//! full, the producer evicts the oldest entry and retries once, so producers
//! are never blocked by a slow storage consumer. Under sustained overload
//! the newest samples win and the oldest are lost, bounded and best-effort.
//!
//! FIFO order of surviving items is preserved. Pushes from different
//! producers may interleave in any order.

use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

use crate::error::QueueFull;
use crate::snapshot::Snapshot;

/// Queue capacity used when none is configured
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Bounded MPSC queue with a drop-oldest overflow policy
#[derive(Debug)]
pub struct SampleQueue {
    buffer: Mutex<VecDeque<Snapshot>>,
    capacity: usize,
    notify: Notify,
}

impl SampleQueue {
    /// Create a queue with the given fixed capacity
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; config validation rejects that earlier.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be nonzero");
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            notify: Notify::new(),
        }
    }

    /// The fixed capacity this queue was built with
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items currently queued
    pub fn len(&self) -> usize {
        self.buffer.lock().expect("queue lock poisoned").len()
    }

    /// Whether the queue is currently empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Non-blocking push
    ///
    /// # Errors
    ///
    /// Returns `QueueFull` if the queue is at capacity; the item is not
    /// stored.
    pub fn try_push(&self, item: Snapshot) -> Result<(), QueueFull> {
        {
            let mut buffer = self.buffer.lock().expect("queue lock poisoned");
            if buffer.len() >= self.capacity {
                return Err(QueueFull);
            }
            buffer.push_back(item);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Non-blocking pop of the oldest item
    pub fn try_pop(&self) -> Option<Snapshot> {
        self.buffer.lock().expect("queue lock poisoned").pop_front()
    }

    /// Push with the drop-oldest overflow policy
    ///
    /// Tries a plain push; on `QueueFull`, pops exactly one entry (the
    /// current oldest) and retries the push once. If the retry also fails
    /// (the consumer drained and another producer raced in), the item is
    /// silently dropped.
    ///
    /// # Returns
    ///
    /// * `bool` - Whether the item was admitted to the queue
    pub fn push_evicting(&self, item: Snapshot) -> bool {
        if self.try_push(item).is_ok() {
            return true;
        }

        let _evicted = self.try_pop();
        self.try_push(item).is_ok()
    }

    /// Suspend until an item is available, then pop it (FIFO)
    ///
    /// The log writer's primary wait state. Single-consumer: only one task
    /// may call this.
    pub async fn pop_blocking(&self) -> Snapshot {
        loop {
            // Register for a wakeup before checking, so a push between the
            // check and the await is not missed.
            let notified = self.notify.notified();
            if let Some(item) = self.try_pop() {
                return item;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn record(tag: i32) -> Snapshot {
        Snapshot {
            pressure: tag,
            ..Snapshot::default()
        }
    }

    #[test]
    fn test_fifo_order() {
        let queue = SampleQueue::new(DEFAULT_QUEUE_CAPACITY);
        for tag in 1..=DEFAULT_QUEUE_CAPACITY as i32 {
            queue.try_push(record(tag)).unwrap();
        }
        for tag in 1..=DEFAULT_QUEUE_CAPACITY as i32 {
            assert_eq!(queue.try_pop().unwrap().pressure, tag);
        }
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn test_try_push_full_rejects_item() {
        let queue = SampleQueue::new(2);
        queue.try_push(record(1)).unwrap();
        queue.try_push(record(2)).unwrap();

        assert_eq!(queue.try_push(record(3)), Err(QueueFull));
        assert_eq!(queue.len(), 2);
        // The rejected item left the queue untouched
        assert_eq!(queue.try_pop().unwrap().pressure, 1);
    }

    #[test]
    fn test_push_evicting_drops_oldest() {
        let capacity = DEFAULT_QUEUE_CAPACITY;
        let queue = SampleQueue::new(capacity);

        // Push C+1 items without any pop; item 1 must be evicted
        for tag in 1..=(capacity + 1) as i32 {
            assert!(queue.push_evicting(record(tag)));
        }

        let drained: Vec<i32> = std::iter::from_fn(|| queue.try_pop())
            .map(|snapshot| snapshot.pressure)
            .collect();
        let expected: Vec<i32> = (2..=(capacity + 1) as i32).collect();
        assert_eq!(drained, expected);
    }

    #[test]
    fn test_push_evicting_when_not_full_keeps_everything() {
        let queue = SampleQueue::new(4);
        assert!(queue.push_evicting(record(1)));
        assert!(queue.push_evicting(record(2)));
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn test_pop_blocking_returns_queued_item() {
        let queue = SampleQueue::new(4);
        queue.try_push(record(7)).unwrap();
        assert_eq!(queue.pop_blocking().await.pressure, 7);
    }

    #[tokio::test]
    async fn test_pop_blocking_wakes_on_push() {
        let queue = Arc::new(SampleQueue::new(4));

        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop_blocking().await })
        };

        // Give the consumer time to park on the empty queue
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.try_push(record(42)).unwrap();

        let popped = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer never woke up")
            .unwrap();
        assert_eq!(popped.pressure, 42);
    }

    #[tokio::test]
    async fn test_interleaved_producers_preserve_per_queue_fifo() {
        let queue = Arc::new(SampleQueue::new(64));
        let mut handles = Vec::new();

        for producer in 0..3i32 {
            let queue = Arc::clone(&queue);
            handles.push(tokio::spawn(async move {
                for sample in 0..10 {
                    queue.try_push(record(producer * 100 + sample)).unwrap();
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Per-producer ordering survives arbitrary interleaving
        let mut last_seen = [-1i32; 3];
        while let Some(snapshot) = queue.try_pop() {
            let producer = (snapshot.pressure / 100) as usize;
            assert!(snapshot.pressure > last_seen[producer]);
            last_seen[producer] = snapshot.pressure;
        }
    }
}
