//! # Engine Configuration
//!
//! Tunables for the window, camera, world streaming and worker cadences. Loaded from an
//! optional JSON file; every missing field falls back to its default.

use std::{fs, path::Path, path::PathBuf};

use serde::Deserialize;

use crate::error::EngineError;

/// Engine-wide settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial window width in pixels.
    pub window_width: u32,
    /// Initial window height in pixels.
    pub window_height: u32,
    /// Window title.
    pub window_title: String,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    /// Maximum distance, in blocks, at which the player can target a block.
    pub block_reach_range: f32,
    /// Camera movement speed in blocks per second.
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    /// Radius, in chunks, of the cube kept loaded around the player.
    pub render_distance: i32,
    /// Generate terrain procedurally instead of loading a terrain source.
    pub infinite_world: bool,
    /// Terrain source used when `infinite_world` is off.
    pub terrain_file: Option<PathBuf>,
    /// Directory holding the `slotN.json` terrain sources offered by the load menu.
    pub save_directory: PathBuf,
    /// Recording played back in record mode.
    pub record_file: Option<PathBuf>,
    pub world_seed: u32,
    /// Chunks generated per terrain worker iteration.
    pub generation_batch: usize,
    /// Recently unloaded chunks kept around for reuse.
    pub unloaded_chunk_cache: usize,
    /// World ticks per second.
    pub tick_rate: u32,
    pub entities_per_batch: usize,
    /// Interval between two player target raycasts.
    pub input_poll_interval_ms: u64,
    /// Consecutive failed publish attempts after which a worker publishes blocking.
    pub force_publish_after: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_width: 800,
            window_height: 800,
            window_title: "VoxelEng".to_owned(),
            fov_degrees: 110.0,
            z_near: 0.1,
            z_far: 500.0,
            block_reach_range: 5.0,
            movement_speed: 8.0,
            mouse_sensitivity: 0.5,
            render_distance: 2,
            infinite_world: true,
            terrain_file: None,
            save_directory: PathBuf::from("saves"),
            record_file: None,
            world_seed: 0,
            generation_batch: 4,
            unloaded_chunk_cache: 64,
            tick_rate: 20,
            entities_per_batch: 64,
            input_poll_interval_ms: 5,
            force_publish_after: 8,
        }
    }
}

impl EngineConfig {
    /// Reads a configuration file.
    ///
    /// # Arguments
    /// * `path` - JSON file to read
    ///
    /// # Returns
    /// The parsed configuration, or a resource error naming the file
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let text = fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| EngineError::Format {
            path: path.to_owned(),
            source,
        })
    }

    /// Path of the terrain source behind load menu slot `slot`.
    pub fn slot_path(&self, slot: u8) -> PathBuf {
        self.save_directory.join(format!("slot{}.json", slot))
    }
}
