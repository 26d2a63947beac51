//! # Chunk Meshing
//!
//! Turns block data into triangle lists. Faces between two solid cells of the same chunk
//! are culled; faces on the chunk border are always emitted.
//!
//! ## Key Components
//! - `Face`: the four corners of one block face
//! - `mesh_chunk`: face-culled mesh of a whole chunk
//! - `cube`: a free-standing cube, used for entities
//! - `block_outline`: line list around one block, used for the selection highlight

use cgmath::{EuclideanSpace, Point3, Vector3};

use crate::engine_state::voxels::{
    block::{block_side::BlockSide, block_type::BlockType, texture_index},
    chunk::{Chunk, CHUNK_DIMENSION},
};

use super::vertex::Vertex;

/// Vertices emitted for one face (two triangles).
pub const VERTICES_PER_FACE: usize = 6;

/// A single quad face of a voxel.
///
/// Corners are lower-left, lower-right, upper-right, upper-left as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub ll: Point3<f32>,
    pub lr: Point3<f32>,
    pub ur: Point3<f32>,
    pub ul: Point3<f32>,
    pub side: BlockSide,
}

impl Face {
    /// The face `side` of the axis-aligned cube at `origin` with edge length `size`.
    pub fn new(origin: Point3<f32>, size: f32, side: BlockSide) -> Self {
        let corner = |dx: f32, dy: f32, dz: f32| {
            Point3::new(origin.x + dx * size, origin.y + dy * size, origin.z + dz * size)
        };
        let (ll, lr, ur, ul) = match side {
            BlockSide::FRONT => (
                corner(0.0, 0.0, 0.0),
                corner(0.0, 0.0, 1.0),
                corner(0.0, 1.0, 1.0),
                corner(0.0, 1.0, 0.0),
            ),
            BlockSide::BACK => (
                corner(1.0, 0.0, 1.0),
                corner(1.0, 0.0, 0.0),
                corner(1.0, 1.0, 0.0),
                corner(1.0, 1.0, 1.0),
            ),
            BlockSide::BOTTOM => (
                corner(0.0, 0.0, 1.0),
                corner(0.0, 0.0, 0.0),
                corner(1.0, 0.0, 0.0),
                corner(1.0, 0.0, 1.0),
            ),
            BlockSide::TOP => (
                corner(0.0, 1.0, 0.0),
                corner(0.0, 1.0, 1.0),
                corner(1.0, 1.0, 1.0),
                corner(1.0, 1.0, 0.0),
            ),
            BlockSide::LEFT => (
                corner(1.0, 0.0, 0.0),
                corner(0.0, 0.0, 0.0),
                corner(0.0, 1.0, 0.0),
                corner(1.0, 1.0, 0.0),
            ),
            BlockSide::RIGHT => (
                corner(0.0, 0.0, 1.0),
                corner(1.0, 0.0, 1.0),
                corner(1.0, 1.0, 1.0),
                corner(0.0, 1.0, 1.0),
            ),
        };
        Face {
            ll,
            lr,
            ur,
            ul,
            side,
        }
    }

    /// Appends the two triangles of this face to `out`.
    pub fn emit(&self, tile: u32, out: &mut Vec<Vertex>) {
        let normal = self.side.normal();
        out.extend_from_slice(&[
            Vertex::new(self.ll, tile, 0.0, 0.0, normal),
            Vertex::new(self.lr, tile, 1.0, 0.0, normal),
            Vertex::new(self.ur, tile, 1.0, 1.0, normal),
            Vertex::new(self.ll, tile, 0.0, 0.0, normal),
            Vertex::new(self.ur, tile, 1.0, 1.0, normal),
            Vertex::new(self.ul, tile, 0.0, 1.0, normal),
        ]);
    }
}

/// Builds the face-culled mesh of `chunk` in world coordinates.
pub fn mesh_chunk(chunk: &Chunk) -> Vec<Vertex> {
    let base = chunk.position.to_vec() * CHUNK_DIMENSION;
    let mut vertices = Vec::new();

    for (x, y, z, block_type) in chunk.cells() {
        if !block_type.is_solid() {
            continue;
        }
        let origin = Point3::new(
            (base.x + x) as f32,
            (base.y + y) as f32,
            (base.z + z) as f32,
        );
        for side in BlockSide::all() {
            let normal = side.normal();
            if chunk.is_block_solid(x + normal.x, y + normal.y, z + normal.z) {
                continue;
            }
            Face::new(origin, 1.0, side).emit(texture_index(block_type, side), &mut vertices);
        }
    }

    vertices
}

/// All six faces of a cube of `block_type` at `origin`.
pub fn cube(origin: Point3<f32>, size: f32, block_type: BlockType) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity(VERTICES_PER_FACE * 6);
    for side in BlockSide::all() {
        Face::new(origin, size, side).emit(texture_index(block_type, side), &mut vertices);
    }
    vertices
}

/// The 12 edges of the block at `block`, as a line list of 24 vertices.
pub fn block_outline(block: Point3<i32>) -> Vec<Vertex> {
    let origin = Point3::new(block.x as f32, block.y as f32, block.z as f32);
    let corner = |dx: f32, dy: f32, dz: f32| {
        Vertex::new(
            origin + Vector3::new(dx, dy, dz),
            0,
            0.0,
            0.0,
            Vector3::new(0, 0, 0),
        )
    };
    let mut vertices = Vec::with_capacity(24);
    for a in [0.0, 1.0] {
        for b in [0.0, 1.0] {
            vertices.push(corner(0.0, a, b));
            vertices.push(corner(1.0, a, b));
            vertices.push(corner(a, 0.0, b));
            vertices.push(corner(a, 1.0, b));
            vertices.push(corner(a, b, 0.0));
            vertices.push(corner(a, b, 1.0));
        }
    }
    vertices
}
