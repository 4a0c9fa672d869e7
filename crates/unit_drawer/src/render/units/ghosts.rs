//! Ghost registry
//!
//! Ghosts are last-seen snapshots of buildings. While a unit is out of an
//! ally team's line of sight that team draws a *live* ghost; once the unit
//! dies the snapshot becomes a *dead* ghost until the team looks at the spot
//! again (or the ghost gets too old).
//!
//! One record exists per unit and is shared by every ally team that holds a
//! ghost of it. Each holder counts one reference: every ally team bucket
//! listing the record, plus the ground decal linked to it. The record is
//! freed when the last reference is released.

use std::cell::Cell;
use std::collections::HashMap;

use slotmap::{new_key_type, SlotMap};

use crate::foundation::math::Vec3;
use crate::scene::{
    AllyTeamId, DecalId, LosQuery, ModelRef, ModelType, TeamId, Unit, UnitId, MAX_ALLY_TEAMS,
    MODEL_TYPE_COUNT,
};

new_key_type! {
    /// Handle to a ghost record
    pub struct GhostKey;
}

/// Snapshot of a unit as last seen
#[derive(Debug)]
pub struct GhostObject {
    /// Model at the time of the snapshot
    pub model: ModelRef,
    /// World position
    pub position: Vec3,
    /// Front direction
    pub direction: Vec3,
    /// Build facing
    pub facing: i32,
    /// Owning team
    pub team: TeamId,
    /// Unit the snapshot was taken of
    pub unit: UnitId,
    decal: Option<DecalId>,
    ref_count: u32,
    radar_mask: u64,
    died_at: Option<u32>,
    last_draw_frame: Cell<u32>,
}

impl GhostObject {
    fn snapshot(unit: &Unit, model: ModelRef) -> Self {
        Self {
            model,
            position: unit.position,
            direction: unit.direction,
            facing: unit.facing,
            team: unit.team,
            unit: unit.id,
            decal: None,
            ref_count: 0,
            radar_mask: 0,
            died_at: None,
            last_draw_frame: Cell::new(0),
        }
    }

    /// Number of holders
    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    /// Add a holder
    pub fn inc_ref(&mut self) {
        self.ref_count += 1;
    }

    /// Drop a holder; returns true while holders remain
    ///
    /// # Panics
    /// If no holder is left to release. A double release is a lifecycle bug
    /// in the caller.
    pub fn dec_ref(&mut self) -> bool {
        assert!(
            self.ref_count > 0,
            "ghost of unit {:?} released with no outstanding references",
            self.unit
        );
        self.ref_count -= 1;
        self.ref_count > 0
    }

    /// Decal linked to the ghost
    pub fn decal(&self) -> Option<DecalId> {
        self.decal
    }

    /// Frame the underlying unit died on, for dead ghosts
    pub fn died_at(&self) -> Option<u32> {
        self.died_at
    }

    /// True once the unit is gone
    pub fn is_dead(&self) -> bool {
        self.died_at.is_some()
    }

    /// True if `ally` has the unit on radar
    pub fn in_radar(&self, ally: AllyTeamId) -> bool {
        ally < MAX_ALLY_TEAMS && self.radar_mask & (1 << ally) != 0
    }

    /// Last frame the ghost was drawn on
    pub fn last_draw_frame(&self) -> u32 {
        self.last_draw_frame.get()
    }

    pub(crate) fn mark_drawn(&self, frame: u32) {
        self.last_draw_frame.set(frame);
    }
}

#[derive(Debug, Default)]
struct AllyGhosts {
    live: [Vec<GhostKey>; MODEL_TYPE_COUNT],
    dead: [Vec<GhostKey>; MODEL_TYPE_COUNT],
    live_units: HashMap<UnitId, GhostKey>,
}

impl AllyGhosts {
    fn len(&self) -> usize {
        self.live.iter().chain(self.dead.iter()).map(Vec::len).sum()
    }
}

/// Ghost records and the per-ally-team buckets that reference them
#[derive(Debug, Default)]
pub struct GhostRegistry {
    objects: SlotMap<GhostKey, GhostObject>,
    by_unit: HashMap<UnitId, GhostKey>,
    allies: Vec<AllyGhosts>,
}

impl GhostRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn ally_mut(&mut self, ally: AllyTeamId) -> &mut AllyGhosts {
        if self.allies.len() <= ally {
            self.allies.resize_with(ally + 1, AllyGhosts::default);
        }
        &mut self.allies[ally]
    }

    /// `unit` left the line of sight of `ally`
    ///
    /// Creates or refreshes the unit's ghost and lists it in the ally team's
    /// live bucket. Returns the ghost, if the unit leaves one.
    pub fn on_unit_left_los(&mut self, ally: AllyTeamId, unit: &Unit, in_radar: bool) -> Option<GhostKey> {
        if ally >= MAX_ALLY_TEAMS {
            log::warn!("Ignoring ghost for ally team {} (max {})", ally, MAX_ALLY_TEAMS);
            return None;
        }
        if !unit.leaves_ghost {
            return None;
        }
        let Some(model) = unit.model else {
            log::debug!("Unit {:?} has no model, no ghost left behind", unit.id);
            return None;
        };

        let key = match self.by_unit.get(&unit.id) {
            Some(&key) => {
                let ghost = &mut self.objects[key];
                ghost.position = unit.position;
                ghost.direction = unit.direction;
                ghost.facing = unit.facing;
                ghost.team = unit.team;
                key
            }
            None => {
                let key = self.objects.insert(GhostObject::snapshot(unit, model));
                self.by_unit.insert(unit.id, key);
                if let Some(decal) = unit.decal {
                    self.link_decal(key, decal);
                }
                log::trace!("Created ghost {:?} for unit {:?}", key, unit.id);
                key
            }
        };

        let index = self.objects[key].model.model_type.index();
        let bucket = self.ally_mut(ally);
        let listed = bucket.live_units.insert(unit.id, key).is_none();
        if listed {
            bucket.live[index].push(key);
            self.objects[key].inc_ref();
        }
        self.set_in_radar(ally, unit.id, in_radar);

        Some(key)
    }

    /// `unit` is back in the line of sight of `ally`; its live ghost goes
    ///
    /// Returns true if the ally team held a ghost of the unit.
    pub fn on_unit_entered_los(&mut self, ally: AllyTeamId, unit: UnitId) -> bool {
        let Some(bucket) = self.allies.get_mut(ally) else {
            return false;
        };
        let Some(key) = bucket.live_units.remove(&unit) else {
            return false;
        };

        let model_type = self.objects[key].model.model_type;
        bucket.live[model_type.index()].retain(|k| *k != key);
        self.release(key);
        true
    }

    /// Track whether `ally` sees the ghosted unit on radar
    pub fn set_in_radar(&mut self, ally: AllyTeamId, unit: UnitId, in_radar: bool) {
        if ally >= MAX_ALLY_TEAMS {
            return;
        }
        let Some(ghost) = self.by_unit.get(&unit).and_then(|k| self.objects.get_mut(*k)) else {
            return;
        };
        if in_radar {
            ghost.radar_mask |= 1 << ally;
        } else {
            ghost.radar_mask &= !(1 << ally);
        }
    }

    /// `unit` died: every live ghost of it becomes a dead ghost
    ///
    /// The record moves between buckets unchanged; every holder keeps its
    /// reference.
    pub fn on_unit_destroyed(&mut self, unit: UnitId, frame: u32) {
        let Some(key) = self.by_unit.remove(&unit) else {
            return;
        };
        let ghost = &mut self.objects[key];
        ghost.died_at = Some(frame);
        ghost.radar_mask = 0;
        let index = ghost.model.model_type.index();

        for bucket in &mut self.allies {
            if bucket.live_units.remove(&unit).is_some() {
                bucket.live[index].retain(|k| *k != key);
                bucket.dead[index].push(key);
            }
        }
    }

    /// Link a ground decal to a ghost; the decal holds a reference
    pub fn link_decal(&mut self, key: GhostKey, decal: DecalId) {
        let ghost = self.get_mut_or_panic(key);
        if let Some(previous) = ghost.decal.replace(decal) {
            log::warn!("Ghost {:?} already linked to decal {:?}, relinking", key, previous);
            return;
        }
        ghost.inc_ref();
    }

    /// Release the decal's reference to a ghost
    ///
    /// # Panics
    /// If the ghost has no decal linked.
    pub fn release_decal(&mut self, key: GhostKey) {
        let ghost = self.get_mut_or_panic(key);
        assert!(ghost.decal.take().is_some(), "ghost {:?} has no decal to release", key);
        self.release(key);
    }

    /// Add a reference to a ghost
    pub fn retain(&mut self, key: GhostKey) {
        self.get_mut_or_panic(key).inc_ref();
    }

    /// Drop a reference to a ghost, freeing it when none remain
    ///
    /// Returns true if the record was freed.
    ///
    /// # Panics
    /// If the ghost was already freed or has no references left.
    pub fn release(&mut self, key: GhostKey) -> bool {
        if self.get_mut_or_panic(key).dec_ref() {
            return false;
        }

        let Some(ghost) = self.objects.remove(key) else {
            return false;
        };
        if self.by_unit.get(&ghost.unit) == Some(&key) {
            self.by_unit.remove(&ghost.unit);
        }
        if let Some(decal) = ghost.decal {
            log::debug!("Ghost {:?} freed with decal {:?} still linked", key, decal);
        }
        log::trace!("Freed ghost {:?} of unit {:?}", key, ghost.unit);
        true
    }

    fn get_mut_or_panic(&mut self, key: GhostKey) -> &mut GhostObject {
        match self.objects.get_mut(key) {
            Some(ghost) => ghost,
            None => panic!("ghost {:?} used after it was freed", key),
        }
    }

    /// Release dead ghosts that died `lifetime` or more frames before `frame`
    ///
    /// A lifetime of zero keeps dead ghosts until they are seen again.
    /// Returns the number of bucket entries dropped.
    pub fn expire_dead(&mut self, frame: u32, lifetime: u32) -> usize {
        if lifetime == 0 {
            return 0;
        }

        let objects = &self.objects;
        let mut expired = Vec::new();
        for bucket in &mut self.allies {
            for list in &mut bucket.dead {
                list.retain(|key| {
                    let alive = objects
                        .get(*key)
                        .and_then(GhostObject::died_at)
                        .map_or(false, |died| frame.saturating_sub(died) < lifetime);
                    if !alive {
                        expired.push(*key);
                    }
                    alive
                });
            }
        }

        let count = expired.len();
        for key in expired {
            self.release(key);
        }
        count
    }

    /// Release the dead ghosts of `ally` whose spot is back in line of sight
    pub fn update_ghosted_buildings(&mut self, ally: AllyTeamId, los: &dyn LosQuery) -> usize {
        let Some(bucket) = self.allies.get_mut(ally) else {
            return 0;
        };

        let objects = &self.objects;
        let mut seen = Vec::new();
        for list in &mut bucket.dead {
            list.retain(|key| {
                let visible = objects.get(*key).map_or(true, |g| los.in_los(&g.position, ally));
                if visible {
                    seen.push(*key);
                }
                !visible
            });
        }

        let count = seen.len();
        for key in seen {
            self.release(key);
        }
        count
    }

    /// Record behind `key`
    pub fn get(&self, key: GhostKey) -> Option<&GhostObject> {
        self.objects.get(key)
    }

    /// Live ghost `ally` holds for `unit`
    pub fn live_ghost(&self, ally: AllyTeamId, unit: UnitId) -> Option<GhostKey> {
        self.allies.get(ally)?.live_units.get(&unit).copied()
    }

    /// True if `ally` holds a live ghost of `unit`
    pub fn has_live(&self, ally: AllyTeamId, unit: UnitId) -> bool {
        self.live_ghost(ally, unit).is_some()
    }

    /// Live ghosts of `model_type` held by `ally`
    pub fn live(&self, ally: AllyTeamId, model_type: ModelType) -> impl Iterator<Item = (GhostKey, &GhostObject)> {
        self.bucket(ally, model_type, false)
    }

    /// Dead ghosts of `model_type` held by `ally`
    pub fn dead(&self, ally: AllyTeamId, model_type: ModelType) -> impl Iterator<Item = (GhostKey, &GhostObject)> {
        self.bucket(ally, model_type, true)
    }

    fn bucket(&self, ally: AllyTeamId, model_type: ModelType, dead: bool) -> impl Iterator<Item = (GhostKey, &GhostObject)> {
        let keys: &[GhostKey] = match self.allies.get(ally) {
            Some(bucket) if dead => bucket.dead[model_type.index()].as_slice(),
            Some(bucket) => bucket.live[model_type.index()].as_slice(),
            None => &[],
        };
        keys.iter().filter_map(|key| self.objects.get(*key).map(|g| (*key, g)))
    }

    /// Number of bucket entries `ally` holds, live and dead
    pub fn bucket_len(&self, ally: AllyTeamId) -> usize {
        self.allies.get(ally).map_or(0, AllyGhosts::len)
    }

    /// Number of records alive
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True if no record is alive
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Drop every record and bucket
    pub fn clear(&mut self) {
        self.objects.clear();
        self.by_unit.clear();
        self.allies.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ModelId;

    fn building(id: u32) -> Unit {
        let model = ModelRef::new(ModelId(id), ModelType::S3o, 1, 20.0, 30.0);
        Unit::new(UnitId(id), Vec3::new(id as f32 * 100.0, 0.0, 0.0), Some(model)).with_ghost()
    }

    #[test]
    fn test_leaving_los_creates_one_ghost() {
        let mut registry = GhostRegistry::new();
        let unit = building(1);

        let key = registry.on_unit_left_los(0, &unit, false).expect("ghost");
        assert_eq!(registry.on_unit_left_los(0, &unit, false), Some(key));
        assert_eq!(registry.get(key).map(GhostObject::ref_count), Some(1));
        assert_eq!(registry.live(0, ModelType::S3o).count(), 1);
    }

    #[test]
    fn test_mobile_units_leave_no_ghost() {
        let mut registry = GhostRegistry::new();
        let mut unit = building(1);
        unit.leaves_ghost = false;
        assert!(registry.on_unit_left_los(0, &unit, false).is_none());

        let modelless = Unit::new(UnitId(2), Vec3::zeros(), None).with_ghost();
        assert!(registry.on_unit_left_los(0, &modelless, false).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_record_is_shared_between_ally_teams() {
        let mut registry = GhostRegistry::new();
        let unit = building(1);

        let a = registry.on_unit_left_los(0, &unit, false).expect("ghost");
        let b = registry.on_unit_left_los(3, &unit, true).expect("ghost");
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(a).map(GhostObject::ref_count), Some(2));

        let ghost = registry.get(a).expect("ghost");
        assert!(!ghost.in_radar(0));
        assert!(ghost.in_radar(3));
    }

    #[test]
    fn test_reused_record_takes_current_owner() {
        let mut registry = GhostRegistry::new();
        let mut unit = building(1).with_team(7, 2);
        let key = registry.on_unit_left_los(0, &unit, false).expect("ghost");
        assert_eq!(registry.get(key).map(|g| g.team), Some(7));

        unit.team = 9;
        unit.position = Vec3::new(4.0, 0.0, 4.0);
        let reused = registry.on_unit_left_los(1, &unit, false).expect("ghost");
        assert_eq!(reused, key);
        let ghost = registry.get(key).expect("ghost");
        assert_eq!(ghost.team, 9);
        assert_eq!(ghost.position, unit.position);
    }

    #[test]
    fn test_entering_los_frees_unreferenced_ghost() {
        let mut registry = GhostRegistry::new();
        let unit = building(1);

        registry.on_unit_left_los(0, &unit, false);
        assert!(registry.on_unit_entered_los(0, unit.id));
        assert!(registry.is_empty());
        assert!(!registry.has_live(0, unit.id));
        assert!(!registry.on_unit_entered_los(0, unit.id));
    }

    #[test]
    fn test_decal_keeps_ghost_alive() {
        let mut registry = GhostRegistry::new();
        let unit = building(1).with_decal(DecalId(9));

        let key = registry.on_unit_left_los(0, &unit, false).expect("ghost");
        assert_eq!(registry.get(key).map(GhostObject::ref_count), Some(2));

        registry.on_unit_entered_los(0, unit.id);
        assert_eq!(registry.get(key).map(GhostObject::ref_count), Some(1));

        registry.release_decal(key);
        assert!(registry.get(key).is_none());
    }

    #[test]
    #[should_panic(expected = "used after it was freed")]
    fn test_double_release_is_fatal() {
        let mut registry = GhostRegistry::new();
        let key = registry.on_unit_left_los(0, &building(1), false).expect("ghost");
        registry.release(key);
        registry.release(key);
    }

    #[test]
    #[should_panic(expected = "no outstanding references")]
    fn test_dec_ref_below_zero_is_fatal() {
        let mut ghost = GhostObject::snapshot(&building(1), ModelRef::new(ModelId(1), ModelType::S3o, 0, 1.0, 1.0));
        ghost.dec_ref();
    }

    #[test]
    fn test_ref_count_tracks_links() {
        let mut registry = GhostRegistry::new();
        let key = registry.on_unit_left_los(0, &building(1), false).expect("ghost");
        for _ in 0..4 {
            registry.retain(key);
        }
        for _ in 0..4 {
            assert!(!registry.release(key));
        }
        assert_eq!(registry.get(key).map(GhostObject::ref_count), Some(1));
    }

    #[test]
    fn test_destroyed_unit_moves_same_record_to_dead() {
        let mut registry = GhostRegistry::new();
        let unit = building(1);
        let key = registry.on_unit_left_los(0, &unit, true).expect("ghost");
        registry.on_unit_left_los(1, &unit, false);

        registry.on_unit_destroyed(unit.id, 50);

        for ally in [0, 1] {
            assert_eq!(registry.live(ally, ModelType::S3o).count(), 0);
            let dead: Vec<_> = registry.dead(ally, ModelType::S3o).map(|(k, _)| k).collect();
            assert_eq!(dead, vec![key]);
        }
        let ghost = registry.get(key).expect("ghost");
        assert_eq!(ghost.ref_count(), 2);
        assert_eq!(ghost.died_at(), Some(50));
        assert!(!ghost.in_radar(0));
    }

    #[test]
    fn test_dead_ghosts_expire() {
        let mut registry = GhostRegistry::new();
        let unit = building(1);
        registry.on_unit_left_los(0, &unit, false);
        registry.on_unit_destroyed(unit.id, 100);

        assert_eq!(registry.expire_dead(149, 50), 0);
        assert_eq!(registry.bucket_len(0), 1);
        assert_eq!(registry.expire_dead(150, 50), 1);
        assert_eq!(registry.bucket_len(0), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_zero_lifetime_never_expires() {
        let mut registry = GhostRegistry::new();
        let unit = building(1);
        registry.on_unit_left_los(0, &unit, false);
        registry.on_unit_destroyed(unit.id, 0);
        assert_eq!(registry.expire_dead(u32::MAX, 0), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_seen_dead_ghosts_are_released() {
        let mut registry = GhostRegistry::new();
        let near = building(1);
        let far = building(5);
        for unit in [&near, &far] {
            registry.on_unit_left_los(0, unit, false);
            registry.on_unit_destroyed(unit.id, 10);
        }

        let los = |position: &Vec3, _ally: AllyTeamId| position.x < 300.0;
        assert_eq!(registry.update_ghosted_buildings(0, &los), 1);

        let remaining: Vec<_> = registry.dead(0, ModelType::S3o).map(|(_, g)| g.unit).collect();
        assert_eq!(remaining, vec![far.id]);
    }

    #[test]
    fn test_out_of_range_ally_is_ignored() {
        let mut registry = GhostRegistry::new();
        assert!(registry.on_unit_left_los(MAX_ALLY_TEAMS, &building(1), false).is_none());
    }
}
