//! # Input Worker
//!
//! Finds the block the player is looking at, at its own fixed interval and independent
//! of the frame rate. It reads terrain only through its own snapshot reader and the
//! player pose through the shared resource the render thread writes.

use log::trace;
use web_time::{Duration, Instant};

use crate::{
    application_state::config::EngineConfig,
    core::{MtResource, Publisher, SnapshotReader},
    engine_state::{
        camera_state::PlayerPose,
        voxels::{
            raycast::{raycast, BlockHit},
            world::TerrainSnapshot,
        },
    },
};

/// The block the player currently targets.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Selection {
    pub hit: Option<BlockHit>,
}

/// The input worker loop.
pub struct InputWorker {
    publisher: Publisher<Selection>,
    terrain: SnapshotReader<TerrainSnapshot>,
    pose: MtResource<PlayerPose>,
    reach: f32,
    interval: Duration,
    force_publish_after: u32,
}

impl InputWorker {
    pub fn new(
        publisher: Publisher<Selection>,
        terrain: SnapshotReader<TerrainSnapshot>,
        pose: MtResource<PlayerPose>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            publisher,
            terrain,
            pose,
            reach: config.block_reach_range,
            interval: Duration::from_millis(config.input_poll_interval_ms.max(1)),
            force_publish_after: config.force_publish_after,
        }
    }

    /// Runs until the run flag is cleared.
    pub fn run(mut self) {
        let mut published: Option<Option<BlockHit>> = None;

        while self.publisher.is_running() {
            let deadline = Instant::now() + self.interval;
            self.terrain.try_consume();

            let pose = *self.pose.get();
            let terrain = self.terrain.current();
            let hit = raycast(
                |block| terrain.is_solid(block),
                pose.position,
                pose.direction,
                self.reach,
            );

            if published != Some(hit) {
                self.publisher.write().hit = hit;
                if self.publisher.publish_bounded(self.force_publish_after) {
                    trace!("Selection changed to {:?}", hit);
                    published = Some(hit);
                }
            }

            if !self.publisher.idle_until(deadline) {
                break;
            }
        }
    }
}
