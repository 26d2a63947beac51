//! # Worker Set
//!
//! Owns the three long-lived background threads a level needs and enforces the
//! start/stop protocol around them.
//!
//! ## Key Components
//! - `WorkerSlot`: names one of the three worker roles
//! - `WorkerSet`: per-slot "should run" flag plus the owned thread handle
//!
//! Stopping a worker always happens in the same order: clear the run flag through the
//! worker's [`StopSignal`], then join. Workers are never detached.

use std::{
    fmt,
    sync::Arc,
    thread::{self, JoinHandle},
};

use log::{error, info};

use super::double_buffer::StopSignal;
use crate::error::EngineError;

/// One of the background worker roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkerSlot {
    /// Chunk streaming, generation and meshing.
    Terrain,
    /// Fixed-rate world tick and entity batching.
    Tick,
    /// Player target raycasting.
    Input,
}

impl WorkerSlot {
    /// Every slot, in index order.
    pub const ALL: [WorkerSlot; 3] = [WorkerSlot::Terrain, WorkerSlot::Tick, WorkerSlot::Input];

    /// The order in which workers are torn down.
    pub const SHUTDOWN_ORDER: [WorkerSlot; 3] =
        [WorkerSlot::Terrain, WorkerSlot::Input, WorkerSlot::Tick];

    fn index(self) -> usize {
        match self {
            WorkerSlot::Terrain => 0,
            WorkerSlot::Tick => 1,
            WorkerSlot::Input => 2,
        }
    }

    /// Name given to the OS thread running this slot.
    pub fn thread_name(self) -> &'static str {
        match self {
            WorkerSlot::Terrain => "terrain",
            WorkerSlot::Tick => "tick",
            WorkerSlot::Input => "input",
        }
    }
}

impl fmt::Display for WorkerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.thread_name())
    }
}

struct WorkerThread {
    handle: JoinHandle<()>,
    signal: Arc<dyn StopSignal>,
}

#[derive(Default)]
struct SlotState {
    should_run: bool,
    thread: Option<WorkerThread>,
}

/// The set of worker threads owned by the engine context.
#[derive(Default)]
pub struct WorkerSet {
    slots: [SlotState; 3],
}

impl WorkerSet {
    /// Creates a set with every flag cleared and no threads.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows every slot to be started.
    pub fn mark_all_runnable(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.should_run = true;
        }
    }

    /// Whether `slot` may be started, or is running.
    pub fn should_run(&self, slot: WorkerSlot) -> bool {
        self.slots[slot.index()].should_run
    }

    /// Whether any slot still has its flag set.
    pub fn any_should_run(&self) -> bool {
        self.slots.iter().any(|slot| slot.should_run)
    }

    /// Whether `slot` currently owns a thread.
    pub fn is_started(&self, slot: WorkerSlot) -> bool {
        self.slots[slot.index()].thread.is_some()
    }

    /// Number of threads currently owned by the set.
    pub fn thread_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.thread.is_some()).count()
    }

    /// Starts `body` on a named thread for `slot`.
    ///
    /// # Arguments
    /// * `slot` - The role being started
    /// * `signal` - Run flag the body observes; used to stop it later
    /// * `body` - The worker loop
    ///
    /// # Returns
    /// An error if the slot is not runnable, already started, or the OS refused the thread
    pub fn spawn<F>(
        &mut self,
        slot: WorkerSlot,
        signal: Arc<dyn StopSignal>,
        body: F,
    ) -> Result<(), EngineError>
    where
        F: FnOnce() + Send + 'static,
    {
        let state = &mut self.slots[slot.index()];
        if !state.should_run {
            return Err(EngineError::WorkerNotRunnable(slot));
        }
        if state.thread.is_some() {
            return Err(EngineError::AlreadyInitialised(slot.thread_name()));
        }

        let handle = thread::Builder::new()
            .name(slot.thread_name().to_owned())
            .spawn(body)
            .map_err(|source| EngineError::Spawn { slot, source })?;
        info!("Started {} worker", slot);

        state.thread = Some(WorkerThread { handle, signal });
        Ok(())
    }

    /// Stops and joins the worker in `slot`, then clears its flag.
    ///
    /// A worker that panicked is reported here and does not propagate.
    pub fn stop(&mut self, slot: WorkerSlot) {
        let state = &mut self.slots[slot.index()];
        state.should_run = false;

        if let Some(worker) = state.thread.take() {
            worker.signal.request_stop();
            match worker.handle.join() {
                Ok(()) => info!("Stopped {} worker", slot),
                Err(_) => error!("The {} worker panicked before it was stopped", slot),
            }
        }
    }

    /// Stops every worker in teardown order.
    pub fn stop_all(&mut self) {
        for slot in WorkerSlot::SHUTDOWN_ORDER {
            self.stop(slot);
        }
    }
}

impl Drop for WorkerSet {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::double_buffer::DoubleBuffer;

    #[test]
    fn test_spawn_requires_runnable_flag() {
        let mut workers = WorkerSet::new();
        let (publisher, _reader) = DoubleBuffer::channel(0u32, 0u32);
        let result = workers.spawn(WorkerSlot::Tick, publisher.stop_signal(), || {});
        assert!(matches!(
            result,
            Err(EngineError::WorkerNotRunnable(WorkerSlot::Tick))
        ));
        assert_eq!(workers.thread_count(), 0);
    }

    #[test]
    fn test_stop_joins_idle_worker() {
        let mut workers = WorkerSet::new();
        workers.mark_all_runnable();

        let (mut publisher, _reader) = DoubleBuffer::channel(0u32, 0u32);
        let signal = publisher.stop_signal();
        workers
            .spawn(WorkerSlot::Terrain, signal, move || {
                while publisher.wait_for_wakeup() {}
            })
            .unwrap();
        assert!(workers.is_started(WorkerSlot::Terrain));

        workers.stop(WorkerSlot::Terrain);
        assert!(!workers.is_started(WorkerSlot::Terrain));
        assert!(!workers.should_run(WorkerSlot::Terrain));
    }

    #[test]
    fn test_stop_all_clears_every_flag() {
        let mut workers = WorkerSet::new();
        workers.mark_all_runnable();

        for slot in WorkerSlot::ALL {
            let (publisher, _reader) = DoubleBuffer::channel(0u32, 0u32);
            let signal = publisher.stop_signal();
            workers
                .spawn(slot, signal, move || {
                    while publisher.idle_until(web_time::Instant::now() + web_time::Duration::from_secs(60)) {}
                })
                .unwrap();
        }
        assert_eq!(workers.thread_count(), 3);

        workers.stop_all();
        assert_eq!(workers.thread_count(), 0);
        assert!(!workers.any_should_run());
    }

    #[test]
    fn test_panicking_worker_is_contained() {
        let mut workers = WorkerSet::new();
        workers.mark_all_runnable();
        let (publisher, _reader) = DoubleBuffer::channel(0u32, 0u32);
        workers
            .spawn(WorkerSlot::Input, publisher.stop_signal(), || panic!("boom"))
            .unwrap();
        workers.stop(WorkerSlot::Input);
        assert_eq!(workers.thread_count(), 0);
    }
}
