//! Vertex data structures for voxel rendering.

use cgmath::{Point3, Vector3};

/// A vertex in the voxel rendering pipeline.
///
/// # Memory Layout
/// - Position: 3x f32 (12 bytes)
/// - Texture Coordinates: [f32; 2] (8 bytes)
/// - Packed Normal: u32 (4 bytes)
///
/// Total size: 24 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position in world space
    pub position: [f32; 3],
    /// Atlas texture coordinates: tile index plus the corner offset on U, corner on V
    pub tex_coords: [f32; 2],
    /// Normal packed as three signed bytes (x, y, z) in the low 24 bits
    pub normal: u32,
}

impl Vertex {
    /// Creates a new vertex.
    ///
    /// # Arguments
    /// * `position` - World space position
    /// * `tile` - Index of the texture atlas tile
    /// * `u`, `v` - Corner of the tile (0 or 1)
    /// * `normal` - Outward face normal
    pub fn new(position: Point3<f32>, tile: u32, u: f32, v: f32, normal: Vector3<i32>) -> Self {
        Vertex {
            position: position.into(),
            tex_coords: [tile as f32 + u, v],
            normal: pack_normal(normal),
        }
    }

    /// Unpacks the normal.
    pub fn normal(&self) -> Vector3<i32> {
        let component = |shift: u32| ((self.normal >> shift) & 0xFF) as u8 as i8 as i32;
        Vector3::new(component(0), component(8), component(16))
    }
}

fn pack_normal(normal: Vector3<i32>) -> u32 {
    let byte = |value: i32| (value as i8 as u8) as u32;
    byte(normal.x) | byte(normal.y) << 8 | byte(normal.z) << 16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
    }

    #[test]
    fn test_negative_normal_survives_packing() {
        let vertex = Vertex::new(Point3::new(0.0, 0.0, 0.0), 0, 0.0, 0.0, Vector3::new(0, -1, 1));
        assert_eq!(vertex.normal(), Vector3::new(0, -1, 1));
    }
}
