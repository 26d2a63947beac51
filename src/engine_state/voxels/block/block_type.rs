//! # Block Type Module
//!
//! This module defines the different types of blocks in the voxel world.
//! It provides functionality for block type identification, conversion, and random generation.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::BlockTypeSize;

/// Enumerates all possible block types in the voxel world.
///
/// The `FromPrimitive` derive allows conversion from the compact integer ids used in
/// terrain sources and recordings.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum BlockType {
    /// An air block, which is non-solid and transparent.
    AIR,

    /// A basic dirt block, used as a common building material.
    DIRT,

    /// A grass block with different textures on top and sides.
    GRASS,

    /// A wooden block with a bark texture on all sides.
    WOOD,

    /// A plain white block, often used for testing and UI elements.
    WHITE,
}

impl BlockType {
    /// Converts a stored block id to a `BlockType`.
    ///
    /// # Returns
    /// `None` if the id does not name a block type
    pub fn from_id(id: BlockTypeSize) -> Option<Self> {
        FromPrimitive::from_u8(id)
    }

    /// The compact id of this block type.
    pub fn id(self) -> BlockTypeSize {
        self as BlockTypeSize
    }

    /// Whether the block occupies its cell.
    pub fn is_solid(self) -> bool {
        self != BlockType::AIR
    }

    /// Picks a random solid block type from `rng`.
    pub fn random_solid(rng: &mut fastrand::Rng) -> Self {
        match rng.u8(1..5) {
            1 => BlockType::DIRT,
            2 => BlockType::GRASS,
            3 => BlockType::WOOD,
            _ => BlockType::WHITE,
        }
    }
}
