//! Temporary draw units
//!
//! Short-lived previews of unit types (placement ghosts, queued builds) that
//! are not real units. They count down in simulation ticks, independent of
//! how many frames get drawn.

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};
use crate::scene::{ModelRef, ModelType, TeamId, MODEL_TYPE_COUNT};

/// A preview model drawn for a limited number of simulation ticks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempDrawUnit {
    /// Model to draw
    pub model: ModelRef,
    /// Team whose colour to use
    pub team: TeamId,
    /// Build facing, used for the outline
    pub facing: i32,
    /// Remaining ticks
    pub timeout: i32,
    /// World position
    pub position: Vec3,
    /// Rotation around the vertical axis in radians
    pub rotation: f32,
    /// Draw in the alpha pass instead of the opaque pass
    pub draw_alpha: bool,
    /// Also draw the build outline
    pub draw_border: bool,
}

impl TempDrawUnit {
    /// Opaque preview of `model` for `timeout` ticks
    pub fn new(model: ModelRef, team: TeamId, position: Vec3, timeout: i32) -> Self {
        Self {
            model,
            team,
            facing: 0,
            timeout,
            position,
            rotation: 0.0,
            draw_alpha: false,
            draw_border: false,
        }
    }

    /// Builder-style switch to the alpha pass
    pub fn transparent(mut self) -> Self {
        self.draw_alpha = true;
        self
    }

    /// Builder-style build facing; the model is turned to match
    pub fn with_facing(mut self, facing: i32) -> Self {
        self.facing = facing;
        self.rotation = utils::facing_to_radians(facing);
        self
    }

    /// Builder-style build outline
    pub fn with_border(mut self) -> Self {
        self.draw_border = true;
        self
    }

    /// Model-to-world transform
    pub fn transform(&self) -> Mat4 {
        Mat4::from_position_rotation_y(self.position, self.rotation)
    }

    /// Count down one tick; returns true while the unit should stay
    fn tick(&mut self) -> bool {
        self.timeout -= 1;
        self.timeout > 0
    }
}

/// Opaque and alpha temp units, bucketed by model type
#[derive(Debug, Default)]
pub struct TempUnitPool {
    opaque: [Vec<TempDrawUnit>; MODEL_TYPE_COUNT],
    alpha: [Vec<TempDrawUnit>; MODEL_TYPE_COUNT],
}

impl TempUnitPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a temp unit; duplicates are kept
    ///
    /// A unit whose timeout has already run out is dropped and false returned.
    pub fn add(&mut self, unit: TempDrawUnit) -> bool {
        if unit.timeout <= 0 {
            log::debug!("Dropping expired temp unit (timeout {})", unit.timeout);
            return false;
        }
        let index = unit.model.model_type.index();
        if unit.draw_alpha {
            self.alpha[index].push(unit);
        } else {
            self.opaque[index].push(unit);
        }
        true
    }

    /// Advance every temp unit by one simulation tick and drop expired ones
    ///
    /// Returns the number dropped.
    pub fn age_and_prune(&mut self) -> usize {
        let before = self.len();
        for bucket in self.opaque.iter_mut().chain(self.alpha.iter_mut()) {
            bucket.retain_mut(TempDrawUnit::tick);
        }
        before - self.len()
    }

    /// Opaque temp units of `model_type`
    pub fn opaque(&self, model_type: ModelType) -> &[TempDrawUnit] {
        &self.opaque[model_type.index()]
    }

    /// Alpha temp units of `model_type`
    pub fn alpha(&self, model_type: ModelType) -> &[TempDrawUnit] {
        &self.alpha[model_type.index()]
    }

    /// True if no alpha temp unit is queued
    pub fn alpha_is_empty(&self) -> bool {
        self.alpha.iter().all(Vec::is_empty)
    }

    /// Total number of temp units
    pub fn len(&self) -> usize {
        self.opaque.iter().chain(self.alpha.iter()).map(Vec::len).sum()
    }

    /// True if the pool is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything
    pub fn clear(&mut self) {
        for bucket in self.opaque.iter_mut().chain(self.alpha.iter_mut()) {
            bucket.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ModelId;
    use approx::assert_relative_eq;

    fn preview(model_type: ModelType, timeout: i32) -> TempDrawUnit {
        let model = ModelRef::new(ModelId(1), model_type, 0, 10.0, 10.0);
        TempDrawUnit::new(model, 0, Vec3::new(1.0, 2.0, 3.0), timeout)
    }

    #[test]
    fn test_timeout_counts_ticks() {
        let mut pool = TempUnitPool::new();
        pool.add(preview(ModelType::S3o, 3));

        assert_eq!(pool.age_and_prune(), 0);
        assert_eq!(pool.age_and_prune(), 0);
        assert_eq!(pool.opaque(ModelType::S3o)[0].timeout, 1);
        assert_eq!(pool.age_and_prune(), 1);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_single_tick_unit_is_drawable_once() {
        let mut pool = TempUnitPool::new();
        pool.add(preview(ModelType::S3o, 1));
        assert_eq!(pool.len(), 1);
        pool.age_and_prune();
        assert!(pool.is_empty());
    }

    #[test]
    fn test_expired_units_are_not_queued() {
        let mut pool = TempUnitPool::new();
        assert!(!pool.add(preview(ModelType::S3o, 0)));
        assert!(!pool.add(preview(ModelType::S3o, -3).transparent()));
        assert!(pool.is_empty());
        assert!(pool.add(preview(ModelType::S3o, 1)));
    }

    #[test]
    fn test_buckets_by_pass_and_type() {
        let mut pool = TempUnitPool::new();
        pool.add(preview(ModelType::S3o, 5));
        pool.add(preview(ModelType::S3o, 5));
        pool.add(preview(ModelType::ThreeDo, 5).transparent());

        assert_eq!(pool.opaque(ModelType::S3o).len(), 2);
        assert_eq!(pool.alpha(ModelType::ThreeDo).len(), 1);
        assert!(pool.alpha(ModelType::S3o).is_empty());
        assert!(!pool.alpha_is_empty());

        pool.clear();
        assert!(pool.alpha_is_empty());
    }

    #[test]
    fn test_transform_rotates_then_translates() {
        let unit = preview(ModelType::S3o, 1).with_facing(1);
        let m = unit.transform();
        let p = m.transform_point(&nalgebra::Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(p.z, 2.0, epsilon = 1e-5);
    }
}
