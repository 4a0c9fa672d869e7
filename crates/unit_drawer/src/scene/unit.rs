//! Units as seen by the drawer
//!
//! [`Unit`] is the simulation's render-facing view of one entity. The drawer
//! looks units up through [`UnitSource`] every frame and never stores them.

use std::collections::HashMap;

use crate::foundation::math::Vec3;
use super::model::ModelRef;

/// Upper bound on ally teams (visibility is tracked as a 64-bit mask)
pub const MAX_ALLY_TEAMS: usize = 64;

/// Simulation-side unit identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u32);

/// Team (player) identifier
pub type TeamId = i32;

/// Ally team identifier, `0..MAX_ALLY_TEAMS`
pub type AllyTeamId = usize;

/// Ground decal handle owned by the decal system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecalId(pub u32);

/// Icon asset identifier, also the key icon draws are batched by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IconId(pub u32);

/// Icon descriptor provided by the icon-asset system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IconData {
    /// Atlas entry
    pub id: IconId,
    /// On-screen size multiplier
    pub size: f32,
    /// Multiplier on the model/icon switch distance
    pub distance: f32,
    /// Scale the icon with the unit's radius
    pub radius_adjust: bool,
}

impl IconData {
    /// Icon with unit size and distance multipliers
    pub fn new(id: IconId) -> Self {
        Self {
            id,
            size: 1.0,
            distance: 1.0,
            radius_adjust: false,
        }
    }
}

impl Default for IconData {
    fn default() -> Self {
        Self::new(IconId(0))
    }
}

/// Render-facing view of a simulation unit
#[derive(Debug, Clone)]
pub struct Unit {
    /// Identity
    pub id: UnitId,
    /// World position (ground contact point)
    pub position: Vec3,
    /// Facing vector
    pub direction: Vec3,
    /// Building facing (quarter turns), used by ghosts and decals
    pub facing: i32,
    /// Owning team
    pub team: TeamId,
    /// Owning ally team
    pub ally_team: AllyTeamId,
    /// Team colour, RGBA
    pub team_colour: [u8; 4],
    /// Model, absent when the asset failed to load
    pub model: Option<ModelRef>,
    /// Icon used when drawn as an icon
    pub icon: IconData,
    /// Unit type is always drawn as an icon
    pub always_icon: bool,
    /// Unit leaves a ghost when it leaves line of sight (immobile units)
    pub leaves_ghost: bool,
    /// Construction progress, 1.0 when complete
    pub build_progress: f32,
    /// Ground decal associated with the unit
    pub decal: Option<DecalId>,
}

impl Unit {
    /// Create a finished unit at `position`
    pub fn new(id: UnitId, position: Vec3, model: Option<ModelRef>) -> Self {
        Self {
            id,
            position,
            direction: Vec3::z(),
            facing: 0,
            team: 0,
            ally_team: 0,
            team_colour: [255, 255, 255, 255],
            model,
            icon: IconData::default(),
            always_icon: false,
            leaves_ghost: false,
            build_progress: 1.0,
            decal: None,
        }
    }

    /// Set team and ally team
    pub fn with_team(mut self, team: TeamId, ally_team: AllyTeamId) -> Self {
        self.team = team;
        self.ally_team = ally_team;
        self
    }

    /// Set the icon
    pub fn with_icon(mut self, icon: IconData) -> Self {
        self.icon = icon;
        self
    }

    /// Mark as a ghost-leaving (immobile) unit
    pub fn with_ghost(mut self) -> Self {
        self.leaves_ghost = true;
        self
    }

    /// Attach a ground decal
    pub fn with_decal(mut self, decal: DecalId) -> Self {
        self.decal = Some(decal);
        self
    }

    /// Centre of the model, where icons are anchored
    pub fn mid_position(&self) -> Vec3 {
        let half_height = self.model.map_or(0.0, |m| m.height * 0.5);
        self.position + Vec3::new(0.0, half_height, 0.0)
    }

    /// Culling radius
    pub fn draw_radius(&self) -> f32 {
        self.model.map_or(0.0, |m| m.radius)
    }

    /// True while under construction
    pub fn is_being_built(&self) -> bool {
        self.build_progress < 1.0
    }

    /// True if any part of the unit is below the water plane
    pub fn is_under_water(&self) -> bool {
        self.position.y < 0.0
    }
}

/// Lookup of live units, implemented by the simulation
pub trait UnitSource {
    /// Unit with `id`, if it still exists
    fn unit(&self, id: UnitId) -> Option<&Unit>;
}

impl UnitSource for HashMap<UnitId, Unit> {
    fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.get(&id)
    }
}

/// Terrain height queries used by reflection culling and icon distances
pub trait GroundQuery {
    /// Approximate terrain height at world `(x, z)`
    fn approximate_height(&self, x: f32, z: f32) -> f32;
}

/// Flat terrain at a fixed height
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatGround(pub f32);

impl GroundQuery for FlatGround {
    fn approximate_height(&self, _x: f32, _z: f32) -> f32 {
        self.0
    }
}

/// Line-of-sight lookup for world positions
pub trait LosQuery {
    /// True if `ally` currently has line of sight to `position`
    fn in_los(&self, position: &Vec3, ally: AllyTeamId) -> bool;
}

impl<F: Fn(&Vec3, AllyTeamId) -> bool> LosQuery for F {
    fn in_los(&self, position: &Vec3, ally: AllyTeamId) -> bool {
        self(position, ally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::model::{ModelId, ModelType};

    #[test]
    fn test_mid_position_uses_model_height() {
        let model = ModelRef::new(ModelId(1), ModelType::S3o, 0, 10.0, 20.0);
        let unit = Unit::new(UnitId(1), Vec3::new(1.0, 0.0, 1.0), Some(model));
        assert_eq!(unit.mid_position(), Vec3::new(1.0, 10.0, 1.0));
        assert_eq!(unit.draw_radius(), 10.0);
    }

    #[test]
    fn test_modelless_unit_has_no_extent() {
        let unit = Unit::new(UnitId(1), Vec3::new(0.0, 5.0, 0.0), None);
        assert_eq!(unit.mid_position(), unit.position);
        assert_eq!(unit.draw_radius(), 0.0);
    }

    #[test]
    fn test_hash_map_is_a_unit_source() {
        let mut units = HashMap::new();
        units.insert(UnitId(7), Unit::new(UnitId(7), Vec3::zeros(), None));
        assert!(units.unit(UnitId(7)).is_some());
        assert!(units.unit(UnitId(8)).is_none());
    }
}
