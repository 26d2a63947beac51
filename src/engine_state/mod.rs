//! # Engine State Module
//!
//! The world side of the engine: everything that exists while a level runs.
//!
//! ## Key Components
//!
//! * `camera_state` - Camera positioning and movement, and the player pose shared with workers
//! * `entities` - Non-terrain world objects, tick functions and record playback
//! * `frame` - The per-frame render-thread coordinator
//! * `level` - Starting a level's workers and holding its render-thread side
//! * `rendering` - The graphics, vertex and GUI seams plus the meshers
//! * `voxels` - Blocks, chunks, terrain generation and loading, raycasting
//! * `workers` - The terrain, tick and input worker loops
//!
//! ## Architecture
//!
//! Three worker threads produce world state and the render thread consumes it. Each
//! producer owns the write side of one double buffer and the render thread only ever
//! try-locks the other side, so a slow worker costs the frame nothing but freshness.
//! The only values the render thread writes for the workers are the player pose, the
//! frame time step and commands sent over channels.

pub mod camera_state;
pub mod entities;
pub mod frame;
pub mod level;
pub mod rendering;
pub mod voxels;
pub mod workers;

/// Represents player actions derived from input
///
/// Movement flags stay set for as long as their key is down.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerAction {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub move_up: bool,
    pub move_down: bool,

    /// View rotation - Some while the mouse moved with the cursor captured
    pub rotate_view: Option<(f64, f64)>,
}
