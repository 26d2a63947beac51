//! # Chunk Generation
//!
//! Procedural terrain for infinite worlds. Generation can fail for a single chunk;
//! the terrain worker logs the failure and skips that chunk.

use std::hash::{Hash, Hasher};

use cgmath::Point3;
use noise::{NoiseFn, Perlin};

use super::{
    block::block_type::BlockType,
    chunk::{Chunk, ChunkPos, CHUNK_DIMENSION},
};
use crate::error::EngineError;

/// Threshold above which Perlin noise is considered solid for terrain generation.
pub const PERLIN_POSITIVE_THRESHOLD: f64 = 0.2;
/// Threshold below which Perlin noise is considered empty for terrain generation.
pub const PERLIN_NEGATIVE_THRESHOLD: f64 = -0.2;
/// Scaling factor applied to world coordinates when sampling Perlin noise.
pub const PERLIN_SCALE_FACTOR: f64 = 0.02;

/// Lowest chunk layer of a generated world.
pub const MIN_CHUNK_Y: i32 = -4;
/// One past the highest chunk layer of a generated world.
pub const MAX_CHUNK_Y: i32 = 4;

/// Produces the block data of one chunk.
pub trait ChunkGenerator: Send {
    fn generate(&self, position: ChunkPos) -> Result<Chunk, EngineError>;
}

/// 3D Perlin noise terrain with caves and overhangs.
pub struct PerlinGenerator {
    perlin: Perlin,
    seed: u32,
}

impl PerlinGenerator {
    pub fn new(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            seed,
        }
    }

    fn chunk_rng(&self, position: ChunkPos) -> fastrand::Rng {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        (self.seed, position.x, position.y, position.z).hash(&mut hasher);
        fastrand::Rng::with_seed(hasher.finish())
    }
}

impl ChunkGenerator for PerlinGenerator {
    fn generate(&self, position: ChunkPos) -> Result<Chunk, EngineError> {
        if !(MIN_CHUNK_Y..MAX_CHUNK_Y).contains(&position.y) {
            return Err(EngineError::ChunkOutOfWorld {
                x: position.x,
                y: position.y,
                z: position.z,
            });
        }

        let mut rng = self.chunk_rng(position);
        let mut chunk = Chunk::empty(position);
        for z in 0..CHUNK_DIMENSION {
            for y in 0..CHUNK_DIMENSION {
                for x in 0..CHUNK_DIMENSION {
                    let world = Point3::new(
                        x + CHUNK_DIMENSION * position.x,
                        y + CHUNK_DIMENSION * position.y,
                        z + CHUNK_DIMENSION * position.z,
                    );
                    let sample = self.perlin.get(to_perlin_pos(world, PERLIN_SCALE_FACTOR));
                    if !(PERLIN_NEGATIVE_THRESHOLD..=PERLIN_POSITIVE_THRESHOLD).contains(&sample) {
                        chunk.set(x, y, z, BlockType::random_solid(&mut rng));
                    }
                }
            }
        }
        Ok(chunk)
    }
}

fn to_perlin_pos(position: Point3<i32>, scale_factor: f64) -> [f64; 3] {
    [
        position.x as f64 * scale_factor,
        position.y as f64 * scale_factor,
        position.z as f64 * scale_factor,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        let generator = PerlinGenerator::new(7);
        let a = generator.generate(Point3::new(1, 0, -2)).unwrap();
        let b = generator.generate(Point3::new(1, 0, -2)).unwrap();
        assert!(a.cells().zip(b.cells()).all(|(left, right)| left == right));
    }

    #[test]
    fn test_chunks_outside_world_height_fail() {
        let generator = PerlinGenerator::new(0);
        let result = generator.generate(Point3::new(0, MAX_CHUNK_Y, 0));
        assert!(matches!(result, Err(EngineError::ChunkOutOfWorld { y, .. }) if y == MAX_CHUNK_Y));
    }
}
