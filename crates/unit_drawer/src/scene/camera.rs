//! # Camera
//!
//! Minimal view description the drawer needs for culling, icon distances and
//! screen-aligned icon quads.
//!
//! ## Coordinate System
//! Right-handed, Y-up world space. The view direction is `target - position`.

use crate::foundation::math::{utils, Vec3};

/// Perspective camera used for culling and icon orientation
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Vertical field of view angle in radians
    pub fov: f32,

    /// Aspect ratio (width / height)
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a perspective camera looking at the origin
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: fov_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    /// Builder-style target setter
    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.target = target;
        self
    }

    /// Normalized view direction
    pub fn forward(&self) -> Vec3 {
        let dir = self.target - self.position;
        if dir.norm_squared() > f32::EPSILON {
            dir.normalize()
        } else {
            Vec3::new(0.0, 0.0, -1.0)
        }
    }

    /// Screen-space right axis in world space
    pub fn right(&self) -> Vec3 {
        let right = self.forward().cross(&self.up);
        if right.norm_squared() > f32::EPSILON {
            right.normalize()
        } else {
            Vec3::x()
        }
    }

    /// Screen-space up axis in world space
    pub fn screen_up(&self) -> Vec3 {
        self.right().cross(&self.forward()).normalize()
    }

    /// Squared distance from the camera to `point`
    pub fn distance_squared(&self, point: &Vec3) -> f32 {
        utils::distance_squared(point, &self.position)
    }

    /// Conservative sphere-vs-frustum test
    ///
    /// The frustum is approximated by the cone through its corners, clipped by
    /// the near and far planes.
    pub fn in_view(&self, center: &Vec3, radius: f32) -> bool {
        let forward = self.forward();
        let offset = center - self.position;
        let along = offset.dot(&forward);

        if along < self.near - radius || along > self.far + radius {
            return false;
        }

        let half_height = (self.fov * 0.5).tan();
        let half_diagonal = half_height * (1.0 + self.aspect * self.aspect).sqrt();
        let cone_angle = half_diagonal.atan();

        let lateral = (offset - forward * along).norm();
        lateral * cone_angle.cos() - along * cone_angle.sin() <= radius
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(Vec3::new(0.0, 100.0, 100.0), 45.0, 16.0 / 9.0, 1.0, 10_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera() -> Camera {
        Camera::perspective(Vec3::zeros(), 90.0, 1.0, 1.0, 100.0)
            .looking_at(Vec3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn test_basis_is_orthonormal() {
        let cam = camera();
        assert_relative_eq!(cam.forward().dot(&cam.right()), 0.0, epsilon = 1e-6);
        assert_relative_eq!(cam.right().dot(&cam.screen_up()), 0.0, epsilon = 1e-6);
        assert_relative_eq!(cam.screen_up(), Vec3::y(), epsilon = 1e-6);
    }

    #[test]
    fn test_in_view_ahead_and_behind() {
        let cam = camera();
        assert!(cam.in_view(&Vec3::new(0.0, 0.0, -10.0), 1.0));
        assert!(!cam.in_view(&Vec3::new(0.0, 0.0, 10.0), 1.0));
        assert!(!cam.in_view(&Vec3::new(0.0, 0.0, -500.0), 1.0));
    }

    #[test]
    fn test_in_view_respects_radius_at_edge() {
        let cam = camera();
        // Far outside the cone sideways, but a big radius reaches back in.
        let point = Vec3::new(40.0, 0.0, -10.0);
        assert!(!cam.in_view(&point, 1.0));
        assert!(cam.in_view(&point, 40.0));
    }
}
