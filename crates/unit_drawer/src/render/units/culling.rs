//! Per-unit cull tests
//!
//! Containers decide *what* may be drawn; these tests decide whether a unit
//! is worth drawing from the current camera.

use crate::foundation::math::Vec3;
use crate::scene::{Camera, GroundQuery, Unit};

/// Which view an opaque pass renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewMode {
    /// Normal player view
    #[default]
    Normal,
    /// Water reflection
    Reflection,
    /// Water refraction: only submerged units
    Refraction,
}

/// True if an object at `object` can appear in the water reflection seen from `camera`
///
/// Submerged objects are visible if the ground under them is within
/// `max_radius` of the surface. Other objects are visible if the point where
/// the camera-to-object line meets the water plane lies over water deep
/// enough to reflect them.
pub fn object_visible_reflection(object: &Vec3, camera: &Vec3, max_radius: f32, ground: &dyn GroundQuery) -> bool {
    if object.y < 0.0 {
        return ground.approximate_height(object.x, object.z) < max_radius;
    }

    let dif = object.y - camera.y;
    if dif.abs() <= f32::EPSILON {
        return ground.approximate_height(object.x, object.z) < max_radius;
    }

    let zero = camera * (object.y / dif) + object * (-camera.y / dif);
    ground.approximate_height(zero.x, zero.z) < max_radius
}

/// Camera test for units in the opaque and alpha passes
pub fn can_draw_unit(unit: &Unit, camera: &Camera, mode: ViewMode, ground: &dyn GroundQuery) -> bool {
    let mid = unit.mid_position();
    match mode {
        ViewMode::Normal => {}
        ViewMode::Refraction => {
            if !unit.is_under_water() {
                return false;
            }
        }
        ViewMode::Reflection => {
            if !object_visible_reflection(&mid, &camera.position, unit.draw_radius(), ground) {
                return false;
            }
        }
    }
    camera.in_view(&mid, unit.draw_radius())
}

/// Permissive test for shadow casters
///
/// With a shadow camera the unit must be inside its frustum; without one
/// only the draw distance from the player camera applies.
pub fn can_draw_unit_shadow(unit: &Unit, camera: &Camera, shadow_camera: Option<&Camera>, draw_dist_sqr: f32) -> bool {
    let mid = unit.mid_position();
    match shadow_camera {
        Some(shadow) => shadow.in_view(&mid, unit.draw_radius()),
        None => camera.distance_squared(&unit.position) <= draw_dist_sqr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{FlatGround, ModelId, ModelRef, ModelType, UnitId};

    struct Slope;

    impl GroundQuery for Slope {
        fn approximate_height(&self, x: f32, _z: f32) -> f32 {
            x
        }
    }

    fn unit_at(position: Vec3) -> Unit {
        let model = ModelRef::new(ModelId(1), ModelType::S3o, 0, 10.0, 10.0);
        Unit::new(UnitId(1), position, Some(model))
    }

    fn camera() -> Camera {
        Camera::perspective(Vec3::new(0.0, 100.0, 100.0), 60.0, 1.0, 1.0, 2000.0)
    }

    #[test]
    fn test_submerged_object_over_deep_ground() {
        let object = Vec3::new(-50.0, -5.0, 0.0);
        assert!(object_visible_reflection(&object, &Vec3::new(0.0, 100.0, 0.0), 10.0, &Slope));
        let object = Vec3::new(50.0, -5.0, 0.0);
        assert!(!object_visible_reflection(&object, &Vec3::new(0.0, 100.0, 0.0), 10.0, &Slope));
    }

    #[test]
    fn test_reflection_point_between_camera_and_object() {
        // Camera at x=0,y=100; object at x=100,y=100 never meets the water
        // plane, so the object position itself is tested.
        let level = Vec3::new(100.0, 100.0, 0.0);
        assert!(!object_visible_reflection(&level, &Vec3::new(0.0, 100.0, 0.0), 10.0, &Slope));

        // Object at y=50: the line hits y=0 at x=-100, deep under water.
        let object = Vec3::new(-50.0, 50.0, 0.0);
        assert!(object_visible_reflection(&object, &Vec3::new(0.0, 100.0, 0.0), 10.0, &Slope));
    }

    #[test]
    fn test_refraction_only_draws_submerged_units() {
        let ground = FlatGround(-20.0);
        assert!(!can_draw_unit(&unit_at(Vec3::zeros()), &camera(), ViewMode::Refraction, &ground));
        assert!(can_draw_unit(&unit_at(Vec3::new(0.0, -15.0, 0.0)), &camera(), ViewMode::Refraction, &ground));
    }

    #[test]
    fn test_units_behind_camera_are_culled() {
        let ground = FlatGround(0.0);
        assert!(can_draw_unit(&unit_at(Vec3::zeros()), &camera(), ViewMode::Normal, &ground));
        assert!(!can_draw_unit(&unit_at(Vec3::new(0.0, 200.0, 400.0)), &camera(), ViewMode::Normal, &ground));
    }

    #[test]
    fn test_shadow_without_shadow_camera_uses_distance() {
        let far = unit_at(Vec3::new(0.0, 100.0, -900.0));
        let cam = camera();
        assert!(can_draw_unit_shadow(&far, &cam, None, 1000.0 * 1000.0));
        assert!(!can_draw_unit_shadow(&far, &cam, None, 500.0 * 500.0));
    }

    #[test]
    fn test_shadow_camera_frustum() {
        let unit = unit_at(Vec3::zeros());
        let sun = Camera::perspective(Vec3::new(0.0, 500.0, 0.0), 30.0, 1.0, 1.0, 1000.0);
        let away = sun.clone().looking_at(Vec3::new(0.0, 1000.0, 0.0));
        assert!(can_draw_unit_shadow(&unit, &camera(), Some(&sun), 0.0));
        assert!(!can_draw_unit_shadow(&unit, &camera(), Some(&away), 0.0));
    }
}
