//! # Workers
//!
//! The three long-lived background threads of a running level. Each owns the write end
//! of one double buffer and loops until its run flag is cleared:
//!
//! * `terrain` - chunk streaming, generation and meshing
//! * `tick` - fixed-rate world tick and entity batching
//! * `input` - player target raycasting
//!
//! A worker only ever blocks on its own buffer's condition variable, and only while it
//! has nothing to do.

pub mod input;
pub mod terrain;
pub mod tick;

pub use input::{InputWorker, Selection};
pub use terrain::{TerrainCommand, TerrainSource, TerrainWorker};
pub use tick::TickWorker;
