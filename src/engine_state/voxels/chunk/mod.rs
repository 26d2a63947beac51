//! # Chunk Module
//!
//! This module provides the `Chunk` struct: a 16x16x16 block of voxel data.
//!
//! ## Storage
//! - `blocks`: one `BlockTypeSize` per cell, in x, then y, then z order
//! - `solid_array`: one bit per cell mirroring whether the cell is solid
//!
//! The bit vector makes the solidity checks done by meshing and raycasting O(1)
//! without decoding block types.

use bitvec::prelude::*;
use cgmath::Point3;

use super::block::{block_type::BlockType, BlockTypeSize};

/// The dimension (width, height, depth) of a chunk in blocks.
pub const CHUNK_DIMENSION: i32 = 16;
/// The number of blocks in a single 2D plane of a chunk (CHUNK_DIMENSION²).
pub const CHUNK_PLANE_SIZE: i32 = CHUNK_DIMENSION * CHUNK_DIMENSION;
/// The total number of blocks in a chunk (CHUNK_DIMENSION³).
pub const CHUNK_SIZE: i32 = CHUNK_PLANE_SIZE * CHUNK_DIMENSION;

/// Integer coordinate of a chunk in chunk units.
pub type ChunkPos = Point3<i32>;

/// Represents a 16x16x16 collection of voxel blocks in the world.
#[derive(Clone, Debug)]
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not block coordinates).
    pub position: ChunkPos,

    /// Bit per cell: solid (1) or air (0).
    solid_array: BitVec,

    blocks: Vec<BlockTypeSize>,
}

impl Chunk {
    /// Creates a new, completely empty chunk (all blocks are air).
    pub fn empty(position: ChunkPos) -> Self {
        Chunk {
            position,
            solid_array: bitvec![0; CHUNK_SIZE as usize],
            blocks: vec![BlockType::AIR.id(); CHUNK_SIZE as usize],
        }
    }

    /// Creates a chunk from its cells in storage order.
    ///
    /// # Returns
    /// `None` unless exactly `CHUNK_SIZE` cells are supplied
    pub fn from_cells(position: ChunkPos, cells: impl IntoIterator<Item = BlockType>) -> Option<Self> {
        let mut chunk = Chunk::empty(position);
        let mut count = 0;
        for (index, block_type) in cells.into_iter().enumerate() {
            if index >= CHUNK_SIZE as usize {
                return None;
            }
            chunk.blocks[index] = block_type.id();
            chunk.solid_array.set(index, block_type.is_solid());
            count += 1;
        }
        (count == CHUNK_SIZE as usize).then_some(chunk)
    }

    /// Storage index of chunk-relative coordinates.
    ///
    /// # Returns
    /// `None` if any coordinate is outside `0..CHUNK_DIMENSION`
    pub fn index(x: i32, y: i32, z: i32) -> Option<usize> {
        let range = 0..CHUNK_DIMENSION;
        if range.contains(&x) && range.contains(&y) && range.contains(&z) {
            Some((x + CHUNK_DIMENSION * y + CHUNK_PLANE_SIZE * z) as usize)
        } else {
            None
        }
    }

    /// Gets the block type at the specified chunk-relative coordinates.
    ///
    /// Out-of-bounds coordinates read as air.
    pub fn get(&self, x: i32, y: i32, z: i32) -> BlockType {
        Self::index(x, y, z)
            .and_then(|index| BlockType::from_id(self.blocks[index]))
            .unwrap_or(BlockType::AIR)
    }

    /// Checks if the block at the specified chunk-relative coordinates is solid.
    ///
    /// # Returns
    /// `true` if the block is solid, `false` if it's air or out of bounds.
    pub fn is_block_solid(&self, x: i32, y: i32, z: i32) -> bool {
        Self::index(x, y, z).is_some_and(|index| self.solid_array[index])
    }

    /// Replaces the block at the specified chunk-relative coordinates.
    ///
    /// # Returns
    /// `false` if the coordinates are out of bounds
    pub fn set(&mut self, x: i32, y: i32, z: i32, block_type: BlockType) -> bool {
        match Self::index(x, y, z) {
            Some(index) => {
                self.blocks[index] = block_type.id();
                self.solid_array.set(index, block_type.is_solid());
                true
            }
            None => false,
        }
    }

    /// Number of solid cells.
    pub fn solid_count(&self) -> usize {
        self.solid_array.count_ones()
    }

    /// Iterates over every cell as `(x, y, z, type)` in storage order.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32, i32, BlockType)> + '_ {
        self.blocks.iter().enumerate().map(|(index, id)| {
            let index = index as i32;
            (
                index % CHUNK_DIMENSION,
                (index / CHUNK_DIMENSION) % CHUNK_DIMENSION,
                index / CHUNK_PLANE_SIZE,
                BlockType::from_id(*id).unwrap_or(BlockType::AIR),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_updates_solid_mask() {
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        assert!(!chunk.is_block_solid(1, 2, 3));
        assert!(chunk.set(1, 2, 3, BlockType::DIRT));
        assert!(chunk.is_block_solid(1, 2, 3));
        assert_eq!(chunk.get(1, 2, 3), BlockType::DIRT);
        assert_eq!(chunk.solid_count(), 1);

        chunk.set(1, 2, 3, BlockType::AIR);
        assert_eq!(chunk.solid_count(), 0);
    }

    #[test]
    fn test_out_of_bounds_reads_as_air() {
        let chunk = Chunk::from_cells(
            Point3::new(0, 0, 0),
            std::iter::repeat(BlockType::WOOD).take(CHUNK_SIZE as usize),
        )
        .unwrap();
        assert!(chunk.is_block_solid(15, 15, 15));
        assert!(!chunk.is_block_solid(16, 0, 0));
        assert!(!chunk.is_block_solid(0, -1, 0));
        assert_eq!(chunk.get(0, 0, 16), BlockType::AIR);
    }

    #[test]
    fn test_from_cells_rejects_wrong_length() {
        let short = std::iter::repeat(BlockType::AIR).take(10);
        assert!(Chunk::from_cells(Point3::new(0, 0, 0), short).is_none());
    }

    #[test]
    fn test_cells_follow_storage_order() {
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        chunk.set(3, 4, 5, BlockType::GRASS);
        let found: Vec<_> = chunk
            .cells()
            .filter(|(_, _, _, block_type)| block_type.is_solid())
            .collect();
        assert_eq!(found, vec![(3, 4, 5, BlockType::GRASS)]);
    }
}
