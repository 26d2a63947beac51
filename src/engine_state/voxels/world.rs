//! # World Module
//!
//! The shared, immutable views of the terrain that the terrain worker publishes.
//!
//! ## Architecture
//!
//! Every entry is an `Arc`, so copying a whole map only copies pointers. The terrain
//! worker keeps the authoritative maps; before each publish it brings its write-side
//! snapshot up to date with [`ChunkMap::reconcile`], which only touches entries whose
//! pointer changed.

use std::{collections::HashMap, sync::Arc};

use cgmath::Point3;

use super::{
    block::block_type::BlockType,
    chunk::{Chunk, ChunkPos, CHUNK_DIMENSION},
};
use crate::engine_state::rendering::vertex::Vertex;

/// A map from chunk position to shared per-chunk data.
pub struct ChunkMap<V: ?Sized> {
    entries: HashMap<ChunkPos, Arc<V>>,
}

/// Vertex data of every chunk that has something to draw.
pub type DrawableChunkSet = ChunkMap<[Vertex]>;

/// Block data of every loaded chunk.
pub type ChunkSet = ChunkMap<Chunk>;

impl<V: ?Sized> Default for ChunkMap<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V: ?Sized> Clone for ChunkMap<V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<V: ?Sized> ChunkMap<V> {
    pub fn get(&self, position: &ChunkPos) -> Option<&Arc<V>> {
        self.entries.get(position)
    }

    pub fn insert(&mut self, position: ChunkPos, value: Arc<V>) {
        self.entries.insert(position, value);
    }

    pub fn remove(&mut self, position: &ChunkPos) -> Option<Arc<V>> {
        self.entries.remove(position)
    }

    pub fn contains(&self, position: &ChunkPos) -> bool {
        self.entries.contains_key(position)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChunkPos, &Arc<V>)> {
        self.entries.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &Arc<V>> {
        self.entries.values()
    }

    /// Makes this map hold exactly the entries of `source`.
    ///
    /// Entries already pointing at the same allocation are left alone.
    ///
    /// # Returns
    /// The number of entries inserted, replaced or removed
    pub fn reconcile(&mut self, source: &HashMap<ChunkPos, Arc<V>>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|position, _| source.contains_key(position));
        let mut changes = before - self.entries.len();

        for (position, value) in source {
            match self.entries.get(position) {
                Some(current) if Arc::ptr_eq(current, value) => {}
                _ => {
                    self.entries.insert(*position, value.clone());
                    changes += 1;
                }
            }
        }
        changes
    }
}

/// What the terrain worker hands to the render thread.
#[derive(Clone, Default)]
pub struct TerrainSnapshot {
    /// Meshes of the chunks with at least one visible face.
    pub drawable: DrawableChunkSet,
    /// Block data of every loaded chunk.
    pub blocks: ChunkSet,
}

impl TerrainSnapshot {
    /// Block type at a world block coordinate. Unloaded space reads as air.
    pub fn block_at(&self, position: Point3<i32>) -> BlockType {
        let (chunk_position, local) = split_world_position(position);
        self.blocks
            .get(&chunk_position)
            .map(|chunk| chunk.get(local.x, local.y, local.z))
            .unwrap_or(BlockType::AIR)
    }

    /// Whether the block at a world coordinate is solid.
    pub fn is_solid(&self, position: Point3<i32>) -> bool {
        let (chunk_position, local) = split_world_position(position);
        self.blocks
            .get(&chunk_position)
            .is_some_and(|chunk| chunk.is_block_solid(local.x, local.y, local.z))
    }

    /// Total number of vertices across every drawable chunk.
    pub fn vertex_count(&self) -> usize {
        self.drawable.values().map(|vertices| vertices.len()).sum()
    }
}

/// Splits a world block coordinate into its chunk and the chunk-relative coordinate.
pub fn split_world_position(position: Point3<i32>) -> (ChunkPos, Point3<i32>) {
    let chunk = Point3::new(
        position.x.div_euclid(CHUNK_DIMENSION),
        position.y.div_euclid(CHUNK_DIMENSION),
        position.z.div_euclid(CHUNK_DIMENSION),
    );
    let local = Point3::new(
        position.x.rem_euclid(CHUNK_DIMENSION),
        position.y.rem_euclid(CHUNK_DIMENSION),
        position.z.rem_euclid(CHUNK_DIMENSION),
    );
    (chunk, local)
}
