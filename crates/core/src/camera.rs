//! Perspective camera driven by device orientation.
//!
//! The camera sits at a fixed position and only rotates: the orientation
//! controller writes its quaternion every frame.

use glam::{Mat4, Quat, Vec3};

use crate::config::CameraConfig;

/// Perspective camera with a free orientation.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    /// Field of view in radians.
    fov: f32,
    /// Aspect ratio (width / height).
    aspect: f32,
    /// Near clipping plane.
    near: f32,
    /// Far clipping plane.
    far: f32,
    position: Vec3,
    orientation: Quat,

    // Cached matrices
    view_matrix: Mat4,
    projection_matrix: Mat4,
}

impl PerspectiveCamera {
    /// Create a camera from config, sized for `aspect`.
    pub fn new(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self {
            fov: config.fov_degrees.to_radians(),
            aspect: sanitize_aspect(aspect),
            near: config.near,
            far: config.far,
            position: Vec3::from_array(config.position),
            orientation: Quat::IDENTITY,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
        };
        camera.update_matrices();
        camera
    }

    /// Get the view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        self.view_matrix
    }

    /// Get the projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    /// Get the combined view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix * self.view_matrix
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: Quat) {
        self.orientation = orientation.normalize();
        self.update_matrices();
    }

    /// Direction the camera looks along (local -Z).
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    /// Get field of view in radians.
    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn clip_planes(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    fn update_matrices(&mut self) {
        // View is the inverse of the camera's world transform.
        let world = Mat4::from_rotation_translation(self.orientation, self.position);
        self.view_matrix = world.inverse();

        self.projection_matrix = Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far);
    }

    /// Project a world point to normalized device coordinates.
    pub fn world_to_ndc(&self, world_pos: Vec3) -> Vec3 {
        let clip = self.view_projection_matrix() * world_pos.extend(1.0);
        Vec3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w)
    }
}

fn sanitize_aspect(aspect: f32) -> f32 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}
