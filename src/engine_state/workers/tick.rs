//! # Tick Worker
//!
//! Runs the global tick functions at a fixed rate and republishes the entity render
//! batches whenever an entity changed. Entity commands from other threads are drained
//! at the start of each tick, so they never interleave with tick processing.

use std::sync::mpsc::Receiver;

use log::debug;
use web_time::{Duration, Instant};

use crate::{
    application_state::config::EngineConfig,
    core::Publisher,
    engine_state::{
        entities::{EntityBatchList, EntityCommand, EntityManager, TickInfo, TickRegistry},
        frame::TimeStep,
    },
};

/// The tick worker loop and the entity state it owns.
pub struct TickWorker {
    publisher: Publisher<EntityBatchList>,
    entities: EntityManager,
    registry: TickRegistry,
    commands: Receiver<EntityCommand>,
    time_step: TimeStep,
    interval: Duration,
    entities_per_batch: usize,
    force_publish_after: u32,
    tick: u64,
}

impl TickWorker {
    pub fn new(
        publisher: Publisher<EntityBatchList>,
        registry: TickRegistry,
        commands: Receiver<EntityCommand>,
        time_step: TimeStep,
        config: &EngineConfig,
    ) -> Self {
        Self {
            publisher,
            entities: EntityManager::new(),
            registry,
            commands,
            time_step,
            interval: Duration::from_secs(1) / config.tick_rate.max(1),
            entities_per_batch: config.entities_per_batch.max(1),
            force_publish_after: config.force_publish_after,
            tick: 0,
        }
    }

    /// Runs until the run flag is cleared.
    pub fn run(mut self) {
        let mut next_tick = Instant::now();
        let mut dirty = true;

        while self.publisher.is_running() {
            while let Ok(command) = self.commands.try_recv() {
                self.entities.apply(command);
            }

            self.registry.run(
                &mut self.entities,
                TickInfo {
                    tick: self.tick,
                    frame_time: self.time_step.get(),
                },
            );
            self.tick += 1;

            if self.entities.take_changed() {
                *self.publisher.write() = self.entities.batches(self.entities_per_batch);
                dirty = true;
            }
            if dirty && self.publisher.publish_bounded(self.force_publish_after) {
                debug!("Published {} entities", self.entities.len());
                dirty = false;
            }

            next_tick += self.interval;
            let now = Instant::now();
            if next_tick < now {
                next_tick = now;
            }
            if !self.publisher.idle_until(next_tick) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{DoubleBuffer, StopSignal},
        engine_state::voxels::block::block_type::BlockType,
    };
    use cgmath::Point3;
    use std::{sync::mpsc::channel, thread};

    #[test]
    fn test_commands_become_batches() {
        let (publisher, mut reader) = DoubleBuffer::channel(Vec::new(), Vec::new());
        let signal = publisher.stop_signal();
        let (commands, receiver) = channel();
        let config = EngineConfig {
            tick_rate: 200,
            entities_per_batch: 2,
            ..EngineConfig::default()
        };
        let worker = TickWorker::new(
            publisher,
            TickRegistry::new(),
            receiver,
            TimeStep::default(),
            &config,
        );
        let handle = thread::spawn(move || worker.run());

        reader.wait_until_first_ready().unwrap();
        for x in 0..3 {
            commands
                .send(EntityCommand::Spawn {
                    position: Point3::new(x as f32, 0.0, 0.0),
                    block_type: BlockType::WOOD,
                })
                .unwrap();
        }
        while reader.current().len() != 2 {
            reader.try_consume();
            thread::yield_now();
        }
        assert_eq!(reader.current()[1].len(), 36);

        signal.request_stop();
        handle.join().unwrap();
    }

    #[test]
    fn test_stop_interrupts_long_tick_interval() {
        let (publisher, reader) = DoubleBuffer::<EntityBatchList>::channel(Vec::new(), Vec::new());
        let signal = publisher.stop_signal();
        let (_commands, receiver) = channel();
        let config = EngineConfig {
            tick_rate: 1,
            ..EngineConfig::default()
        };
        let worker = TickWorker::new(
            publisher,
            TickRegistry::new(),
            receiver,
            TimeStep::default(),
            &config,
        );
        let started = Instant::now();
        let handle = thread::spawn(move || worker.run());

        reader.wait_until_first_ready().unwrap();
        signal.request_stop();
        handle.join().unwrap();
        assert!(started.elapsed() < Duration::from_millis(900));
    }
}
