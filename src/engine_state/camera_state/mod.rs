//! # Camera State Management
//!
//! This module handles all camera-related functionality including:
//! - Camera position and orientation tracking
//! - View and projection matrix calculations
//! - Player input processing for camera control
//! - The player pose shared with the worker threads
//!
//! ## Core Components
//! - `Camera`: Represents the camera's position and orientation in 3D space
//! - `CameraController`: Handles player input and updates camera state
//! - `Projection`: Manages the camera's projection matrix
//! - `PlayerPose`: The minimal camera state workers need (position, facing)

use camera::{Camera, CameraController, Projection};
use cgmath::{Deg, Matrix4, Point3, Vector3};
use web_time::Duration;

use super::{
    voxels::chunk::{ChunkPos, CHUNK_DIMENSION},
    PlayerAction,
};
use crate::application_state::config::EngineConfig;

pub mod camera;

/// Where the player is and where they are looking.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerPose {
    pub position: Point3<f32>,
    /// Normalized view direction.
    pub direction: Vector3<f32>,
}

impl PlayerPose {
    /// The chunk containing the player.
    pub fn chunk_position(&self) -> ChunkPos {
        let dimension = CHUNK_DIMENSION as f32;
        Point3::new(
            (self.position.x / dimension).floor() as i32,
            (self.position.y / dimension).floor() as i32,
            (self.position.z / dimension).floor() as i32,
        )
    }
}

/// Manages the complete camera system.
///
/// # Fields
/// - `camera`: The current camera state (position, orientation)
/// - `projection`: Perspective settings
/// - `camera_controller`: Handles player input and camera movement
pub struct CameraState {
    /// The current camera position and orientation
    pub camera: Camera,
    /// Perspective projection, resized with the window
    pub projection: Projection,
    /// Handles player input and camera movement
    pub camera_controller: CameraController,
}

impl CameraState {
    /// Creates a camera at the world origin looking along +X.
    pub fn new(config: &EngineConfig) -> Self {
        let camera = Camera::new(Point3::new(0.0, 0.0, 0.0), Deg(0.0), Deg(0.0));
        let projection = Projection::new(
            config.window_width,
            config.window_height,
            Deg(config.fov_degrees),
            config.z_near,
            config.z_far,
        );
        let camera_controller =
            CameraController::new(config.movement_speed, config.mouse_sensitivity);

        CameraState {
            camera,
            projection,
            camera_controller,
        }
    }

    /// Processes player input actions and updates the camera controller state.
    pub fn intake_actions(&mut self, actions: &PlayerAction) {
        self.camera_controller.intake_actions(actions);
    }

    /// Applies pending controller input.
    ///
    /// # Returns
    /// `true` if the camera moved or turned
    pub fn update(&mut self, dt: Duration) -> bool {
        if !self.camera_controller.has_updates() {
            return false;
        }
        self.camera
            .get_controller_updates_and_reset_controller(&mut self.camera_controller, dt);
        true
    }

    /// Projection times view.
    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection.calc_matrix() * self.camera.calc_matrix()
    }

    pub fn pose(&self) -> PlayerPose {
        PlayerPose {
            position: self.camera.position,
            direction: self.camera.forward(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_position_floors_negative_coordinates() {
        let pose = PlayerPose {
            position: Point3::new(-0.5, 16.0, 31.9),
            direction: Vector3::new(1.0, 0.0, 0.0),
        };
        assert_eq!(pose.chunk_position(), Point3::new(-1, 1, 1));
    }
}
