//! # Voxels Module
//!
//! Block, chunk and world data plus the ways terrain comes into existence.
//!
//! ## Key Components
//! - `block`: block types and faces
//! - `chunk`: 16x16x16 block storage
//! - `world`: shared chunk maps and the published `TerrainSnapshot`
//! - `generator`: procedural chunk generation for infinite worlds
//! - `terrain_source`: JSON terrain sources for finite worlds
//! - `raycast`: grid traversal for block targeting

pub mod block;
pub mod chunk;
pub mod generator;
pub mod raycast;
pub mod terrain_source;
pub mod world;
