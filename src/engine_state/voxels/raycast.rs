//! Voxel traversal raycast used to find the block the player is looking at.

use cgmath::{InnerSpace, Point3, Vector3};

/// A block hit by a ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockHit {
    /// World coordinate of the hit block.
    pub block: Point3<i32>,
    /// Outward normal of the face the ray entered through.
    pub normal: Vector3<i32>,
    /// Distance from the ray origin to the entry point.
    pub distance: f32,
}

impl BlockHit {
    /// The empty cell in front of the hit face, where a placed block would go.
    pub fn adjacent(&self) -> Point3<i32> {
        self.block + self.normal
    }
}

/// Walks the grid cells crossed by a ray and returns the first solid one.
///
/// The cell containing `origin` is never reported.
///
/// # Arguments
/// * `is_solid` - Solidity query for world block coordinates
/// * `origin` - Ray origin in world space
/// * `direction` - Ray direction, need not be normalized
/// * `reach` - Maximum distance to walk
///
/// A non-finite origin, direction or reach hits nothing.
pub fn raycast(
    is_solid: impl Fn(Point3<i32>) -> bool,
    origin: Point3<f32>,
    direction: Vector3<f32>,
    reach: f32,
) -> Option<BlockHit> {
    let finite = [origin.x, origin.y, origin.z, direction.x, direction.y, direction.z, reach]
        .iter()
        .all(|value| value.is_finite());
    if !finite || direction.magnitude2() <= f32::EPSILON {
        return None;
    }
    let direction = direction.normalize();

    let mut block = Point3::new(
        origin.x.floor() as i32,
        origin.y.floor() as i32,
        origin.z.floor() as i32,
    );
    let origin = [origin.x, origin.y, origin.z];
    let direction = [direction.x, direction.y, direction.z];

    let mut step = [0i32; 3];
    let mut t_max = [f32::INFINITY; 3];
    let mut t_delta = [f32::INFINITY; 3];
    let cell = [block.x, block.y, block.z];
    for axis in 0..3 {
        if direction[axis] > 0.0 {
            step[axis] = 1;
            t_delta[axis] = 1.0 / direction[axis];
            t_max[axis] = (cell[axis] as f32 + 1.0 - origin[axis]) * t_delta[axis];
        } else if direction[axis] < 0.0 {
            step[axis] = -1;
            t_delta[axis] = -1.0 / direction[axis];
            t_max[axis] = (origin[axis] - cell[axis] as f32) * t_delta[axis];
        }
    }

    loop {
        let axis = if t_max[0] <= t_max[1] && t_max[0] <= t_max[2] {
            0
        } else if t_max[1] <= t_max[2] {
            1
        } else {
            2
        };

        let distance = t_max[axis];
        if distance > reach {
            return None;
        }

        let mut normal = Vector3::new(0, 0, 0);
        match axis {
            0 => {
                block.x += step[0];
                normal.x = -step[0];
            }
            1 => {
                block.y += step[1];
                normal.y = -step[1];
            }
            _ => {
                block.z += step[2];
                normal.z = -step[2];
            }
        }
        t_max[axis] += t_delta[axis];

        if is_solid(block) {
            return Some(BlockHit {
                block,
                normal,
                distance,
            });
        }
    }
}
