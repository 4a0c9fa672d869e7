//! Icon classification
//!
//! Decides each frame whether a unit is drawn as a full model or as an icon,
//! and keeps icon units grouped by icon so the icon pass issues one batched
//! draw per icon. Icon units skip model transform work; only their icon
//! anchor is refreshed, and only when the unit moved.

use std::collections::{BTreeMap, HashMap};

use bitflags::bitflags;

use crate::config::{clamp_distance, MIN_ICON_DIST};
use crate::foundation::math::Vec3;
use crate::render::backend::IconVertex;
use crate::scene::{Camera, GroundQuery, IconData, IconId, Unit, UnitId, UnitSource};

/// Icon length is `ICON_LENGTH_SCALE * unit_icon_dist²`
pub const ICON_LENGTH_SCALE: f32 = 750.0;

/// Unit radius at which a radius-adjusted icon has its nominal size
pub const ICON_RADIUS_SCALE: f32 = 30.0;

/// Base on-screen icon scale
pub const ICON_SIZE_SCALE: f32 = 0.4;

/// Colour of radar blips
pub const RADAR_BLIP_COLOUR: [u8; 4] = [255, 255, 255, 255];

bitflags! {
    /// Reasons to draw a unit as an icon regardless of distance
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ForceIcon: u8 {
        /// The unit type is always drawn as an icon
        const UNIT_TYPE = 1 << 0;
        /// Only radar sees the unit
        const RADAR_BLIP = 1 << 1;
    }
}

/// Per-unit icon classification for the current frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IconState {
    /// Icon to draw
    pub icon: IconData,
    /// Drawn as an anonymous radar contact
    pub as_radar_blip: bool,
}

#[derive(Debug, Clone, Copy)]
struct IconAnchor {
    /// Unit position when the anchor was computed
    position: Vec3,
    /// Where the icon quad is centred
    anchor: Vec3,
}

/// Model/icon decision and icon batching
#[derive(Debug)]
pub struct IconClassifier {
    unit_icon_dist: f32,
    icon_length: f32,
    use_dist_to_ground: bool,
    sq_cam_dist_to_ground: f32,
    radar_icon: IconData,
    groups: BTreeMap<IconId, Vec<UnitId>>,
    states: HashMap<UnitId, IconState>,
    anchors: HashMap<UnitId, IconAnchor>,
}

impl IconClassifier {
    /// Create a classifier with the given icon distance
    pub fn new(unit_icon_dist: f32, use_dist_to_ground: bool) -> Self {
        let mut classifier = Self {
            unit_icon_dist: 0.0,
            icon_length: 0.0,
            use_dist_to_ground,
            sq_cam_dist_to_ground: 0.0,
            radar_icon: IconData::default(),
            groups: BTreeMap::new(),
            states: HashMap::new(),
            anchors: HashMap::new(),
        };
        classifier.set_unit_icon_dist(unit_icon_dist);
        classifier
    }

    /// Set the icon distance; negative values are clamped
    pub fn set_unit_icon_dist(&mut self, dist: f32) {
        self.unit_icon_dist = clamp_distance(dist, MIN_ICON_DIST, "unit_icon_dist");
        self.icon_length = ICON_LENGTH_SCALE * self.unit_icon_dist * self.unit_icon_dist;
    }

    /// Current icon distance
    pub fn unit_icon_dist(&self) -> f32 {
        self.unit_icon_dist
    }

    /// Squared switch distance for an icon with distance multiplier 1
    pub fn icon_length(&self) -> f32 {
        self.icon_length
    }

    /// Measure icon distance from camera to ground instead of camera to unit
    pub fn set_use_dist_to_ground(&mut self, enabled: bool) {
        self.use_dist_to_ground = enabled;
    }

    /// Icon used for radar contacts the viewer has never seen
    pub fn radar_icon(&self) -> IconData {
        self.radar_icon
    }

    /// Replace the generic radar icon
    pub fn set_radar_icon(&mut self, icon: IconData) {
        self.radar_icon = icon;
    }

    /// Refresh the camera height above ground, once per frame
    pub fn update_camera(&mut self, camera: &Camera, ground: &dyn GroundQuery) {
        let height = camera.position.y - ground.approximate_height(camera.position.x, camera.position.z);
        let height = height.max(0.0);
        self.sq_cam_dist_to_ground = height * height;
    }

    /// True if a unit at squared camera distance `sq_unit_cam_dist` is drawn as an icon
    ///
    /// Pure in its inputs: forcing flags, the icon's distance multiplier, the
    /// configured thresholds and the distance. A distance exactly at the
    /// threshold selects the icon.
    pub fn draw_as_icon(&self, force: ForceIcon, icon: &IconData, sq_unit_cam_dist: f32) -> bool {
        if !force.is_empty() {
            return true;
        }

        let real_icon_length = self.icon_length * icon.distance * icon.distance;
        let sq_dist = if self.use_dist_to_ground {
            self.sq_cam_dist_to_ground
        } else {
            sq_unit_cam_dist
        };

        sq_dist >= real_icon_length
    }

    /// Put `unit` in the group for `state.icon`, leaving any previous group
    pub fn assign(&mut self, unit: UnitId, state: IconState) {
        if let Some(previous) = self.states.insert(unit, state) {
            if previous.icon.id == state.icon.id {
                return;
            }
            self.leave_group(unit, previous.icon.id);
        }
        self.groups.entry(state.icon.id).or_default().push(unit);
    }

    /// Take `unit` out of its icon group
    pub fn remove(&mut self, unit: UnitId) -> Option<IconState> {
        let state = self.states.remove(&unit)?;
        self.leave_group(unit, state.icon.id);
        Some(state)
    }

    /// Drop everything known about `unit`, anchor included
    pub fn forget(&mut self, unit: UnitId) {
        self.remove(unit);
        self.anchors.remove(&unit);
    }

    fn leave_group(&mut self, unit: UnitId, icon: IconId) {
        if let Some(members) = self.groups.get_mut(&icon) {
            members.retain(|u| *u != unit);
            if members.is_empty() {
                self.groups.remove(&icon);
            }
        }
    }

    /// Icon state of `unit`, if it is currently drawn as an icon
    pub fn state(&self, unit: UnitId) -> Option<&IconState> {
        self.states.get(&unit)
    }

    /// True if `unit` is in an icon group
    pub fn contains(&self, unit: UnitId) -> bool {
        self.states.contains_key(&unit)
    }

    /// Icon groups in icon order
    pub fn groups(&self) -> impl Iterator<Item = (IconId, &[UnitId])> {
        self.groups.iter().map(|(icon, units)| (*icon, units.as_slice()))
    }

    /// Number of units drawn as icons
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// True if no unit is drawn as an icon
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Recompute the icon anchor of `unit` if it moved since the last call
    ///
    /// Returns true if the anchor was recomputed.
    pub fn update_anchor(&mut self, unit: &Unit) -> bool {
        match self.anchors.get(&unit.id) {
            Some(anchor) if anchor.position == unit.position => false,
            _ => {
                self.anchors.insert(
                    unit.id,
                    IconAnchor {
                        position: unit.position,
                        anchor: unit.mid_position(),
                    },
                );
                true
            }
        }
    }

    /// Last computed anchor of `unit`
    pub fn anchor(&self, unit: UnitId) -> Option<Vec3> {
        self.anchors.get(&unit).map(|a| a.anchor)
    }

    /// Screen-aligned quads for every unit in `members`, four vertices each
    pub fn build_quads(&self, members: &[UnitId], units: &dyn UnitSource, camera: &Camera) -> Vec<IconVertex> {
        let right = camera.right();
        let up = camera.screen_up();
        let mut vertices = Vec::with_capacity(members.len() * 4);

        for id in members {
            let (Some(state), Some(unit)) = (self.states.get(id), units.unit(*id)) else {
                continue;
            };
            let position = self.anchor(*id).unwrap_or_else(|| unit.mid_position());

            let dist = (position - camera.position).norm();
            let mut scale = ICON_SIZE_SCALE * state.icon.size * dist.sqrt();
            if state.icon.radius_adjust && !state.as_radar_blip {
                scale *= unit.draw_radius() / ICON_RADIUS_SCALE;
            }

            let dx = right * scale;
            let dy = up * scale;
            let color = if state.as_radar_blip { RADAR_BLIP_COLOUR } else { unit.team_colour };

            let corners = [
                (position - dx + dy, [0.0, 0.0]),
                (position + dx + dy, [1.0, 0.0]),
                (position + dx - dy, [1.0, 1.0]),
                (position - dx - dy, [0.0, 1.0]),
            ];
            for (corner, uv) in corners {
                vertices.push(IconVertex {
                    position: [corner.x, corner.y, corner.z],
                    uv,
                    color,
                });
            }
        }

        vertices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{FlatGround, ModelId, ModelRef, ModelType};
    use approx::assert_relative_eq;

    fn icon(id: u32) -> IconData {
        IconData::new(IconId(id))
    }

    #[test]
    fn test_icon_length_from_icon_dist() {
        let classifier = IconClassifier::new(2.0, false);
        assert_relative_eq!(classifier.icon_length(), 3000.0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let classifier = IconClassifier::new(2.0, false);
        let length = classifier.icon_length();
        assert!(!classifier.draw_as_icon(ForceIcon::empty(), &icon(1), length - 1.0));
        assert!(classifier.draw_as_icon(ForceIcon::empty(), &icon(1), length));
        assert!(classifier.draw_as_icon(ForceIcon::empty(), &icon(1), length + 1.0));
    }

    #[test]
    fn test_icon_distance_multiplier() {
        let classifier = IconClassifier::new(2.0, false);
        let far_icon = IconData { distance: 2.0, ..icon(1) };
        // Four times the squared distance before switching.
        assert!(!classifier.draw_as_icon(ForceIcon::empty(), &far_icon, 3000.0 * 3.9));
        assert!(classifier.draw_as_icon(ForceIcon::empty(), &far_icon, 3000.0 * 4.0));
    }

    #[test]
    fn test_force_flags_win() {
        let classifier = IconClassifier::new(1000.0, false);
        assert!(classifier.draw_as_icon(ForceIcon::UNIT_TYPE, &icon(1), 0.0));
        assert!(classifier.draw_as_icon(ForceIcon::RADAR_BLIP, &icon(1), 0.0));
    }

    #[test]
    fn test_classification_is_idempotent() {
        let classifier = IconClassifier::new(3.0, false);
        for sq in [0.0, 100.0, 6750.0, 1e6] {
            let first = classifier.draw_as_icon(ForceIcon::empty(), &icon(1), sq);
            let second = classifier.draw_as_icon(ForceIcon::empty(), &icon(1), sq);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_distance_to_ground_mode() {
        let mut classifier = IconClassifier::new(1.0, true);
        let camera = Camera::perspective(Vec3::new(0.0, 10.0, 0.0), 45.0, 1.0, 1.0, 100.0);
        classifier.update_camera(&camera, &FlatGround(0.0));
        // 10² = 100 < 750: model, whatever the unit distance
        assert!(!classifier.draw_as_icon(ForceIcon::empty(), &icon(1), 1e9));

        let high = Camera::perspective(Vec3::new(0.0, 40.0, 0.0), 45.0, 1.0, 1.0, 100.0);
        classifier.update_camera(&high, &FlatGround(0.0));
        assert!(classifier.draw_as_icon(ForceIcon::empty(), &icon(1), 0.0));
    }

    #[test]
    fn test_negative_icon_dist_is_clamped() {
        let classifier = IconClassifier::new(-4.0, false);
        assert_eq!(classifier.unit_icon_dist(), MIN_ICON_DIST);
    }

    #[test]
    fn test_assign_moves_between_groups() {
        let mut classifier = IconClassifier::new(1.0, false);
        let unit = UnitId(1);
        classifier.assign(unit, IconState { icon: icon(1), as_radar_blip: false });
        classifier.assign(unit, IconState { icon: icon(2), as_radar_blip: true });

        let groups: Vec<_> = classifier.groups().map(|(i, u)| (i, u.to_vec())).collect();
        assert_eq!(groups, vec![(IconId(2), vec![unit])]);

        assert!(classifier.remove(unit).is_some());
        assert_eq!(classifier.groups().count(), 0);
        assert!(classifier.remove(unit).is_none());
    }

    #[test]
    fn test_anchor_only_recomputed_after_move() {
        let mut classifier = IconClassifier::new(1.0, false);
        let model = ModelRef::new(ModelId(1), ModelType::S3o, 0, 5.0, 10.0);
        let mut unit = Unit::new(UnitId(1), Vec3::zeros(), Some(model));

        assert!(classifier.update_anchor(&unit));
        assert!(!classifier.update_anchor(&unit));

        unit.position = Vec3::new(3.0, 0.0, 0.0);
        assert!(classifier.update_anchor(&unit));
        assert_eq!(classifier.anchor(unit.id), Some(Vec3::new(3.0, 5.0, 0.0)));
    }

    #[test]
    fn test_quads_are_camera_facing() {
        let mut classifier = IconClassifier::new(1.0, false);
        let model = ModelRef::new(ModelId(1), ModelType::S3o, 0, 5.0, 0.0);
        let unit = Unit::new(UnitId(1), Vec3::new(0.0, 0.0, -100.0), Some(model));
        let camera = Camera::perspective(Vec3::zeros(), 45.0, 1.0, 1.0, 1000.0)
            .looking_at(Vec3::new(0.0, 0.0, -1.0));

        classifier.assign(unit.id, IconState { icon: icon(1), as_radar_blip: true });
        let mut units = HashMap::new();
        units.insert(unit.id, unit);

        let quads = classifier.build_quads(&[UnitId(1)], &units, &camera);
        assert_eq!(quads.len(), 4);
        // All four corners lie in the plane facing the camera.
        for v in &quads {
            assert_relative_eq!(v.position[2], -100.0, epsilon = 1e-4);
            assert_eq!(v.color, RADAR_BLIP_COLOUR);
        }
        // sqrt(100) * 0.4 = 4 world units half-extent
        assert_relative_eq!(quads[1].position[0] - quads[0].position[0], 8.0, epsilon = 1e-4);
    }
}
