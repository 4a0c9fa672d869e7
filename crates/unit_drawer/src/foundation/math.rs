//! Math utilities and types
//!
//! Provides the math types shared by the drawer and its collaborators.

pub use nalgebra::{Matrix4, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;
}

/// Math utility functions
pub mod utils {
    /// Squared distance between two points, avoiding the square root
    pub fn distance_squared(a: &super::Vec3, b: &super::Vec3) -> f32 {
        (a - b).norm_squared()
    }

    /// Rotation (radians around +Y) for a building facing index
    ///
    /// Facings are quarter turns: 0 = south, 1 = east, 2 = north, 3 = west.
    pub fn facing_to_radians(facing: i32) -> f32 {
        facing.rem_euclid(4) as f32 * super::constants::HALF_PI
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a rotation matrix around the Y axis
    fn rotation_y(angle: f32) -> Mat4;

    /// Model matrix placing an object at `position`, its +Z axis along `forward`
    ///
    /// The forward vector is flattened against world up; a degenerate (vertical
    /// or zero) forward falls back to +Z.
    fn from_position_direction(position: Vec3, forward: Vec3) -> Mat4;

    /// Model matrix placing an object at `position`, rotated `angle` radians around +Y
    fn from_position_rotation_y(position: Vec3, angle: f32) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn rotation_y(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::y_axis(), angle)
    }

    fn from_position_direction(position: Vec3, forward: Vec3) -> Mat4 {
        let up = Vec3::y();
        let flat = Vec3::new(forward.x, 0.0, forward.z);
        let forward = if flat.norm_squared() > f32::EPSILON {
            flat.normalize()
        } else {
            Vec3::z()
        };
        let right = up.cross(&forward);

        Mat4::new(
            right.x, up.x, forward.x, position.x,
            right.y, up.y, forward.y, position.y,
            right.z, up.z, forward.z, position.z,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    fn from_position_rotation_y(position: Vec3, angle: f32) -> Mat4 {
        Mat4::new_translation(&position) * Self::rotation_y(angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_position_direction_keeps_translation() {
        let m = Mat4::from_position_direction(Vec3::new(1.0, 2.0, 3.0), Vec3::x());
        let origin = m.transform_point(&nalgebra::Point3::origin());
        assert_relative_eq!(origin.coords, Vec3::new(1.0, 2.0, 3.0), epsilon = 1e-6);
    }

    #[test]
    fn test_position_direction_maps_z_to_forward() {
        let m = Mat4::from_position_direction(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        let z = m.transform_vector(&Vec3::z());
        assert_relative_eq!(z, Vec3::x(), epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_direction_falls_back_to_z() {
        let m = Mat4::from_position_direction(Vec3::zeros(), Vec3::y());
        assert_relative_eq!(m.transform_vector(&Vec3::z()), Vec3::z(), epsilon = 1e-6);
    }

    #[test]
    fn test_rotation_y_matches_facing() {
        let m = Mat4::from_position_rotation_y(Vec3::zeros(), utils::facing_to_radians(1));
        let z = m.transform_vector(&Vec3::z());
        assert_relative_eq!(z, Vec3::x(), epsilon = 1e-6);
        assert_relative_eq!(utils::facing_to_radians(-1), 3.0 * constants::HALF_PI);
    }
}
