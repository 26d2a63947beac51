//! # Double Buffer
//!
//! A two-slot handoff between one producing worker thread and the render thread.
//!
//! The producer owns the *write* side and mutates it freely. When it wants to hand a
//! finished state over it *tries* to take the exchange lock; on success the write and
//! read sides trade places in O(1) and every waiter is notified. The consumer does the
//! same once per frame: it tries the lock and, if something new was published since its
//! last capture, keeps a handle to the fresh read side for the whole frame. Neither side
//! waits for the other in steady state.
//!
//! ## Key Components
//! - `DoubleBuffer`: the shared exchange (read slot, publish generation, run flag)
//! - `Publisher`: the producer handle owning the write slot
//! - `SnapshotReader`: a consumer handle owning its last captured snapshot
//! - `StopSignal`: the run-flag side of the exchange, used by the worker set at teardown
//!
//! ## Aliasing
//! Both slots are `Arc`s. A captured snapshot stays alive and immutable for as long as
//! the consumer keeps it, even after it has been swapped back to the producer. The next
//! `Publisher::write` then clones the container instead of mutating shared memory, so the
//! producer never writes into something a reader can see.
//!
//! ## Worker Run Control
//! The exchange also carries the worker's run flag. Clearing it happens under the same
//! lock the idle worker waits on, followed by `notify_all`, so a stop request can never
//! slip between the worker's flag check and its wait.

use std::sync::Arc;

use log::warn;
use parking_lot::{Condvar, Mutex, MutexGuard};
use web_time::Instant;

use crate::error::EngineError;

/// State guarded by the exchange lock.
struct Exchange<T> {
    /// The most recently published snapshot.
    read: Arc<T>,
    /// Number of successful publishes so far.
    generation: u64,
    /// Number of times a consumer took the lock.
    polls: u64,
    /// Cleared when the owning worker must stop.
    running: bool,
    /// Set when the producer gave up before publishing anything usable.
    failure: Option<String>,
}

/// Shared handoff point between one producer and any number of snapshot readers.
pub struct DoubleBuffer<T> {
    exchange: Mutex<Exchange<T>>,
    signal: Condvar,
}

/// Something a worker set can ask to stop.
pub trait StopSignal: Send + Sync {
    /// Clears the run flag under the worker's wait lock and wakes every waiter.
    fn request_stop(&self);

    /// Whether the run flag is still set.
    fn is_running(&self) -> bool;
}

impl<T: Clone + Send + Sync + 'static> DoubleBuffer<T> {
    /// Creates a new buffer and returns its two ends.
    ///
    /// # Arguments
    /// * `front` - Initial content of the read side (what consumers see before the first publish)
    /// * `back` - Initial content of the write side, owned by the producer
    ///
    /// # Returns
    /// The producer handle and a consumer handle. The consumer handle can be cloned.
    pub fn channel(front: T, back: T) -> (Publisher<T>, SnapshotReader<T>) {
        let front = Arc::new(front);
        let buffer = Arc::new(DoubleBuffer {
            exchange: Mutex::new(Exchange {
                read: front.clone(),
                generation: 0,
                polls: 0,
                running: true,
                failure: None,
            }),
            signal: Condvar::new(),
        });

        let publisher = Publisher {
            buffer: buffer.clone(),
            write: Arc::new(back),
            failed_attempts: 0,
            observed_polls: 0,
        };
        let reader = SnapshotReader {
            buffer,
            current: front,
            seen: 0,
        };

        (publisher, reader)
    }
}

impl<T> DoubleBuffer<T> {
    /// Number of successful publishes so far.
    pub fn generation(&self) -> u64 {
        self.exchange.lock().generation
    }
}

impl<T: Send + Sync> StopSignal for DoubleBuffer<T> {
    fn request_stop(&self) {
        let mut exchange = self.exchange.lock();
        exchange.running = false;
        drop(exchange);
        self.signal.notify_all();
    }

    fn is_running(&self) -> bool {
        self.exchange.lock().running
    }
}

/// Producer end of a [`DoubleBuffer`].
pub struct Publisher<T> {
    buffer: Arc<DoubleBuffer<T>>,
    write: Arc<T>,
    failed_attempts: u32,
    observed_polls: u64,
}

impl<T: Clone + Send + Sync + 'static> Publisher<T> {
    /// Mutable access to the write side.
    ///
    /// If a reader still holds the snapshot that was swapped back to this side, the
    /// container is cloned first and the reader keeps the old one untouched.
    pub fn write(&mut self) -> &mut T {
        Arc::make_mut(&mut self.write)
    }

    /// Read-only view of the write side, as it will be published next.
    pub fn pending(&self) -> &T {
        &self.write
    }

    /// Attempts to publish the write side without blocking.
    ///
    /// On success the write and read sides are swapped, the publish generation is bumped
    /// and every waiter is notified. On failure nothing changes and the write side is kept
    /// for the next attempt.
    ///
    /// # Returns
    /// `true` if the snapshot was published
    pub fn try_publish(&mut self) -> bool {
        let buffer = self.buffer.clone();
        let Some(mut exchange) = buffer.exchange.try_lock() else {
            self.failed_attempts += 1;
            return false;
        };
        self.swap_locked(&mut exchange);
        true
    }

    /// Publishes the write side, waiting for the lock if necessary.
    ///
    /// Consumers only hold the lock for a pointer swap, so the wait is short.
    pub fn publish(&mut self) {
        let buffer = self.buffer.clone();
        let mut exchange = buffer.exchange.lock();
        self.swap_locked(&mut exchange);
    }

    /// Tries to publish and falls back to a blocking publish once `limit`
    /// consecutive attempts have failed.
    ///
    /// # Returns
    /// `true` if the snapshot was published by either path
    pub fn publish_bounded(&mut self, limit: u32) -> bool {
        if self.try_publish() {
            return true;
        }
        if self.failed_attempts >= limit {
            warn!(
                "Forcing publish after {} contended attempts",
                self.failed_attempts
            );
            self.publish();
            return true;
        }
        false
    }

    fn swap_locked(&mut self, exchange: &mut MutexGuard<'_, Exchange<T>>) {
        std::mem::swap(&mut exchange.read, &mut self.write);
        exchange.generation += 1;
        self.failed_attempts = 0;
        self.buffer.signal.notify_all();
    }

    /// Number of consecutive failed `try_publish` calls since the last publish.
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Whether the owning worker should keep going.
    pub fn is_running(&self) -> bool {
        self.buffer.is_running()
    }

    /// Blocks until a consumer polls the buffer or a stop is requested.
    ///
    /// The run flag is re-checked under the lock before every wait.
    ///
    /// # Returns
    /// `false` if the worker must stop
    pub fn wait_for_wakeup(&mut self) -> bool {
        let mut exchange = self.buffer.exchange.lock();
        while exchange.running && exchange.polls == self.observed_polls {
            self.buffer.signal.wait(&mut exchange);
        }
        self.observed_polls = exchange.polls;
        exchange.running
    }

    /// Like [`Publisher::wait_for_wakeup`] but gives up at `deadline`.
    ///
    /// # Returns
    /// `false` if the worker must stop
    pub fn wait_for_wakeup_until(&mut self, deadline: Instant) -> bool {
        let mut exchange = self.buffer.exchange.lock();
        while exchange.running && exchange.polls == self.observed_polls {
            if self
                .buffer
                .signal
                .wait_until(&mut exchange, deadline)
                .timed_out()
            {
                break;
            }
        }
        self.observed_polls = exchange.polls;
        exchange.running
    }

    /// Sleeps until `deadline` unless a stop is requested first.
    ///
    /// Consumer polls do not end the wait.
    ///
    /// # Returns
    /// `false` if the worker must stop
    pub fn idle_until(&self, deadline: Instant) -> bool {
        let mut exchange = self.buffer.exchange.lock();
        while exchange.running {
            if self
                .buffer
                .signal
                .wait_until(&mut exchange, deadline)
                .timed_out()
            {
                break;
            }
        }
        exchange.running
    }

    /// Marks the producer as failed and wakes everyone waiting on the first snapshot.
    pub fn abort(&self, reason: impl Into<String>) {
        let mut exchange = self.buffer.exchange.lock();
        exchange.failure = Some(reason.into());
        exchange.running = false;
        drop(exchange);
        self.buffer.signal.notify_all();
    }

    /// The handle a worker set uses to stop the thread driving this publisher.
    pub fn stop_signal(&self) -> Arc<dyn StopSignal> {
        self.buffer.clone()
    }
}

/// Consumer end of a [`DoubleBuffer`].
///
/// Holds the last captured snapshot. Cloning gives an independent reader over the same
/// buffer with its own capture.
pub struct SnapshotReader<T> {
    buffer: Arc<DoubleBuffer<T>>,
    current: Arc<T>,
    seen: u64,
}

impl<T> Clone for SnapshotReader<T> {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.clone(),
            current: self.current.clone(),
            seen: self.seen,
        }
    }
}

impl<T: Send + Sync> SnapshotReader<T> {
    /// Attempts to capture a newly published snapshot without blocking.
    ///
    /// # Returns
    /// `true` if a snapshot published after the previous capture was taken. `false` if
    /// the lock was busy or nothing new was published; the previous capture stays.
    pub fn try_consume(&mut self) -> bool {
        let buffer = self.buffer.clone();
        let Some(mut exchange) = buffer.exchange.try_lock() else {
            return false;
        };
        self.capture_locked(&mut exchange)
    }

    /// Blocking variant of [`SnapshotReader::try_consume`].
    pub fn consume(&mut self) -> bool {
        let buffer = self.buffer.clone();
        let mut exchange = buffer.exchange.lock();
        self.capture_locked(&mut exchange)
    }

    fn capture_locked(&mut self, exchange: &mut MutexGuard<'_, Exchange<T>>) -> bool {
        exchange.polls += 1;
        let fresh = exchange.generation != self.seen;
        if fresh {
            self.current = exchange.read.clone();
            self.seen = exchange.generation;
        }
        self.buffer.signal.notify_all();
        fresh
    }

    /// Blocks until the producer has published at least once.
    ///
    /// # Returns
    /// An error if the producer aborted or was stopped before its first publish
    pub fn wait_until_first_ready(&self) -> Result<(), EngineError> {
        let mut exchange = self.buffer.exchange.lock();
        loop {
            if exchange.generation > 0 {
                return Ok(());
            }
            if let Some(reason) = &exchange.failure {
                return Err(EngineError::SnapshotUnavailable(reason.clone()));
            }
            if !exchange.running {
                return Err(EngineError::SnapshotUnavailable(
                    "producer stopped before its first publish".to_owned(),
                ));
            }
            self.buffer.signal.wait(&mut exchange);
        }
    }

    /// The snapshot captured by the last successful consume.
    pub fn current(&self) -> &T {
        &self.current
    }

    /// A shared handle to the current snapshot.
    pub fn snapshot(&self) -> Arc<T> {
        self.current.clone()
    }

    /// Publish generation of the current snapshot. Zero means nothing was captured yet.
    pub fn generation(&self) -> u64 {
        self.seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::thread;
    use web_time::Duration;

    #[derive(Clone, Default)]
    struct Stamped {
        version: u64,
        values: Vec<u64>,
    }

    #[test]
    fn test_first_publish_and_stale_consume() {
        let (mut publisher, mut reader) =
            DoubleBuffer::channel(HashMap::<(i32, i32, i32), Vec<u32>>::new(), HashMap::new());

        publisher.write().insert((0, 0, 0), vec![7; 24]);
        assert!(publisher.try_publish());

        reader.wait_until_first_ready().unwrap();
        assert!(reader.try_consume());
        assert_eq!(reader.current()[&(0, 0, 0)].len(), 24);

        assert!(!reader.try_consume());
        assert_eq!(reader.current().len(), 1);
        assert_eq!(reader.current()[&(0, 0, 0)].len(), 24);
    }

    #[test]
    fn test_failed_publish_keeps_write_side() {
        let (mut publisher, reader) = DoubleBuffer::channel(Vec::<u32>::new(), Vec::new());
        publisher.write().push(1);

        let exchange = reader.buffer.exchange.lock();
        assert!(!publisher.try_publish());
        assert_eq!(publisher.failed_attempts(), 1);
        drop(exchange);

        publisher.write().push(2);
        assert_eq!(publisher.pending(), &vec![1, 2]);
        assert!(publisher.try_publish());
        assert_eq!(publisher.failed_attempts(), 0);
    }

    #[test]
    fn test_contended_consume_keeps_capture() {
        let (mut publisher, mut reader) = DoubleBuffer::channel(vec![0u32], vec![0u32]);
        publisher.write()[0] = 5;
        publisher.publish();

        let exchange = publisher.buffer.exchange.lock();
        assert!(!reader.try_consume());
        assert_eq!(reader.current(), &vec![0]);
        drop(exchange);

        assert!(reader.try_consume());
        assert_eq!(reader.current(), &vec![5]);
    }

    #[test]
    fn test_captured_snapshot_is_never_aliased() {
        let (mut publisher, mut reader) = DoubleBuffer::channel(vec![0u32], vec![0u32]);

        publisher.write()[0] = 1;
        publisher.publish();
        assert!(reader.consume());
        publisher.write()[0] = 2;
        publisher.publish();

        // The side the producer now owns is the reader's initial snapshot. Writing to it
        // must not change what the reader captured.
        publisher.write()[0] = 99;
        assert_eq!(reader.current()[0], 1);
        assert!(reader.consume());
        assert_eq!(reader.current()[0], 2);
    }

    #[test]
    fn test_wait_until_first_ready_reports_abort() {
        let (publisher, reader) = DoubleBuffer::channel(0u8, 0u8);
        let waiter = thread::spawn(move || reader.wait_until_first_ready());
        thread::sleep(Duration::from_millis(20));
        publisher.abort("terrain source is missing");
        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(EngineError::SnapshotUnavailable(_))));
    }

    #[test]
    fn test_no_torn_reads_under_contention() {
        const LEN: usize = 256;
        const PUBLISHES: u64 = 2_000;
        let blank = Stamped {
            version: 0,
            values: vec![0; LEN],
        };
        let (mut publisher, mut reader) = DoubleBuffer::channel(blank.clone(), blank);

        let producer = thread::spawn(move || {
            let mut version = 1;
            while version <= PUBLISHES {
                let state = publisher.write();
                state.version = version;
                state.values.iter_mut().for_each(|value| *value = version);
                if publisher.publish_bounded(8) {
                    version += 1;
                }
            }
        });

        let mut last_version = 0;
        while last_version < PUBLISHES {
            reader.try_consume();
            let snapshot = reader.current();
            assert!(snapshot.values.iter().all(|value| *value == snapshot.version));
            assert!(snapshot.version >= last_version);
            last_version = snapshot.version;
        }

        producer.join().unwrap();
    }

    #[test]
    fn test_stop_wakes_idle_producer() {
        let (mut publisher, _reader) = DoubleBuffer::channel(0u32, 0u32);
        let signal = publisher.stop_signal();
        let worker = thread::spawn(move || while publisher.wait_for_wakeup() {});

        thread::sleep(Duration::from_millis(20));
        signal.request_stop();
        worker.join().unwrap();
        assert!(!signal.is_running());
    }

    #[test]
    fn test_consumer_poll_wakes_producer() {
        let (mut publisher, mut reader) = DoubleBuffer::channel(0u32, 0u32);
        let worker = thread::spawn(move || publisher.wait_for_wakeup());

        thread::sleep(Duration::from_millis(20));
        reader.consume();
        assert!(worker.join().unwrap());
    }
}
