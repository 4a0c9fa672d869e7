//! Unit drawer
//!
//! Owns everything needed to draw units each frame: per-model-type render
//! containers, icon groups, ghost buckets and temporary previews. The
//! simulation reports visibility through [`RenderEvent`]s;
//! [`UnitDrawer::update`] turns that into container membership and
//! [`UnitDrawer::draw`] walks the containers pass by pass.
//!
//! From the viewer's point of view a unit is in at most one place at a time:
//! an opaque container, an alpha container, an icon group, or the viewer's
//! ghost buckets. Moving between them happens within a single update.

use std::cell::Cell;
use std::collections::HashMap;

pub mod culling;
pub mod ghosts;
pub mod hooks;
pub mod icons;
pub mod passes;
pub mod temp_units;


pub use culling::ViewMode;
pub use ghosts::{GhostKey, GhostObject, GhostRegistry};
pub use hooks::DrawHooks;
pub use icons::{ForceIcon, IconClassifier, IconState};
pub use passes::{FrameContext, FramePhase, IndividualScope};
pub use temp_units::{TempDrawUnit, TempUnitPool};

use crate::config::{clamp_distance, AlphaValues, Config, ConfigError, DrawerConfig, MIN_DRAW_DIST};
use crate::foundation::logging::LogOnce;
use crate::render::backend::GeometryBufferHandle;
use crate::render::container::ModelRenderContainer;
use crate::render::drawer_state::{DrawerStateKind, DrawerStateSelector, UnitDrawerState};
use crate::scene::{
    AllyTeamId, Camera, DecalId, EventSink, IconId, LosQuery, ModelRef, ModelType, RenderEvent,
    Unit, UnitId, UnitSource, MAX_ALLY_TEAMS, MODEL_TYPE_COUNT,
};
use crate::warn_once;

/// Where a unit is drawn this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DrawSlot {
    /// Not drawn (or represented by a ghost)
    #[default]
    Hidden,
    /// In the opaque container of its model type
    Opaque {
        /// Container the unit is in
        model_type: ModelType,
        /// Texture batch the unit is in
        texture_type: u32,
    },
    /// In the alpha container of its model type
    Alpha {
        /// Container the unit is in
        model_type: ModelType,
        /// Texture batch the unit is in
        texture_type: u32,
    },
    /// In an icon group
    Icon,
}

/// Who the frame is drawn for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewer {
    /// Ally team whose line of sight applies
    pub ally: AllyTeamId,
    /// Spectator view: everything is visible, ghosts are not drawn
    pub full_view: bool,
}

/// Cached visibility of one unit, one bit per ally team
#[derive(Debug, Default)]
struct UnitVisibility {
    los: u64,
    radar: u64,
    prev_los: u64,
    cloaked: bool,
    slot: DrawSlot,
}

enum Placement {
    Hidden,
    Opaque(ModelRef),
    Alpha(ModelRef),
    Icon(IconState),
}

fn ally_bit(ally: AllyTeamId) -> Option<u64> {
    (ally < MAX_ALLY_TEAMS).then(|| 1 << ally)
}

/// Per-frame unit rendering
pub struct UnitDrawer {
    config: DrawerConfig,
    unit_draw_dist_sqr: f32,

    opaque_containers: [ModelRenderContainer; MODEL_TYPE_COUNT],
    alpha_containers: [ModelRenderContainer; MODEL_TYPE_COUNT],
    unsorted_units: Vec<UnitId>,
    visibility: HashMap<UnitId, UnitVisibility>,

    icons: IconClassifier,
    ghosts: GhostRegistry,
    temp_units: TempUnitPool,

    drawer_states: DrawerStateSelector,
    geometry_buffer: Option<GeometryBufferHandle>,
    hooks: Option<Box<dyn DrawHooks>>,

    events: EventSink,
    viewer: Viewer,
    frame: u32,
    sun_changed: Cell<bool>,
    phase: Cell<FramePhase>,
    missing_models: LogOnce<UnitId>,
}

impl UnitDrawer {
    /// Create a drawer; out-of-range settings are clamped
    pub fn new(config: DrawerConfig) -> Self {
        let config = config.sanitized();
        log::info!(
            "Unit drawer: draw distance {}, icon distance {}, deferred {}",
            config.unit_draw_dist,
            config.unit_icon_dist,
            config.draw_deferred
        );

        Self {
            unit_draw_dist_sqr: config.unit_draw_dist * config.unit_draw_dist,
            opaque_containers: Default::default(),
            alpha_containers: Default::default(),
            unsorted_units: Vec::new(),
            visibility: HashMap::new(),
            icons: IconClassifier::new(config.unit_icon_dist, config.use_dist_to_ground_for_icons),
            ghosts: GhostRegistry::new(),
            temp_units: TempUnitPool::new(),
            drawer_states: DrawerStateSelector::new(),
            geometry_buffer: None,
            hooks: None,
            events: EventSink::new(),
            viewer: Viewer::default(),
            frame: 0,
            sun_changed: Cell::new(false),
            phase: Cell::new(FramePhase::Idle),
            missing_models: LogOnce::new(),
            config,
        }
    }

    /// Create a drawer from a TOML or RON configuration file
    pub fn from_config_file(path: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(DrawerConfig::load_from_file(path)?))
    }

    /// Effective configuration
    pub fn config(&self) -> &DrawerConfig {
        &self.config
    }

    /// Maximum distance at which models are drawn
    pub fn unit_draw_dist(&self) -> f32 {
        self.config.unit_draw_dist
    }

    /// Set the model draw distance; values below the minimum are clamped
    pub fn set_unit_draw_dist(&mut self, dist: f32) {
        let dist = clamp_distance(dist, MIN_DRAW_DIST, "unit_draw_dist");
        self.config.unit_draw_dist = dist;
        self.unit_draw_dist_sqr = dist * dist;
    }

    /// Distance scale of the model/icon switch
    pub fn unit_icon_dist(&self) -> f32 {
        self.icons.unit_icon_dist()
    }

    /// Set the icon distance; negative values are clamped
    pub fn set_unit_icon_dist(&mut self, dist: f32) {
        self.icons.set_unit_icon_dist(dist);
        self.config.unit_icon_dist = self.icons.unit_icon_dist();
    }

    /// Switch icon distance measurement to camera height above ground
    pub fn set_use_dist_to_ground_for_icons(&mut self, enabled: bool) {
        self.config.use_dist_to_ground_for_icons = enabled;
        self.icons.set_use_dist_to_ground(enabled);
    }

    /// True if the forward opaque pass runs
    pub fn draw_forward(&self) -> bool {
        self.config.draw_forward
    }

    /// Enable or disable the forward opaque pass
    pub fn set_draw_forward(&mut self, enabled: bool) {
        self.config.draw_forward = enabled;
    }

    /// True if the deferred opaque pass runs
    pub fn draw_deferred(&self) -> bool {
        self.config.draw_deferred
    }

    /// Enable or disable the deferred opaque pass
    pub fn set_draw_deferred(&mut self, enabled: bool) {
        if enabled && self.geometry_buffer.is_none() {
            log::warn!("Deferred unit drawing enabled without a geometry buffer, pass is skipped until one is set");
        }
        self.config.draw_deferred = enabled;
    }

    /// Geometry buffer the deferred pass draws into
    pub fn geometry_buffer(&self) -> Option<GeometryBufferHandle> {
        self.geometry_buffer
    }

    /// Replace the geometry buffer
    pub fn set_geometry_buffer(&mut self, buffer: Option<GeometryBufferHandle>) {
        self.geometry_buffer = buffer;
    }

    /// True if models are rasterized as wireframe
    pub fn wire_frame_mode(&self) -> bool {
        self.config.wire_frame_mode
    }

    /// Toggle wireframe rasterization
    pub fn set_wire_frame_mode(&mut self, enabled: bool) {
        self.config.wire_frame_mode = enabled;
    }

    /// True if the shadow pass runs
    pub fn shadows_enabled(&self) -> bool {
        self.config.shadows_enabled
    }

    /// Enable or disable the shadow pass
    pub fn set_shadows_enabled(&mut self, enabled: bool) {
        self.config.shadows_enabled = enabled;
    }

    /// Alpha values per draw category
    pub fn alpha_values(&self) -> &AlphaValues {
        &self.config.alpha_values
    }

    /// Install or remove script hooks
    pub fn set_hooks(&mut self, hooks: Option<Box<dyn DrawHooks>>) {
        self.hooks = hooks;
    }

    /// The active drawer state
    pub fn active_drawer_state(&self) -> &dyn UnitDrawerState {
        self.drawer_states.active()
    }

    /// Drawer state stored under `kind`
    pub fn drawer_state(&self, kind: DrawerStateKind) -> &dyn UnitDrawerState {
        self.drawer_states.get(kind)
    }

    /// Make `kind` the active drawer state
    pub fn select_drawer_state(&mut self, kind: DrawerStateKind) {
        self.drawer_states.select(kind);
    }

    /// Who frames are drawn for
    pub fn viewer(&self) -> Viewer {
        self.viewer
    }

    /// Handle for queueing events from code that only holds `&self`
    ///
    /// Queued events are applied at the start of the next [`Self::update`].
    pub fn event_sink(&self) -> EventSink {
        self.events.clone()
    }

    /// Apply one event immediately
    pub fn handle_event(&mut self, event: RenderEvent, units: &dyn UnitSource) {
        log::trace!("Render event {:?}", event);
        match event {
            RenderEvent::UnitCreated { unit, cloaked } => self.on_unit_created(unit, cloaked, units),
            RenderEvent::UnitDestroyed { unit } => self.on_unit_destroyed(unit),
            RenderEvent::UnitEnteredLos { unit, ally } => {
                let Some(bit) = self.checked_ally_bit(ally) else { return };
                if let Some(vis) = self.visibility.get_mut(&unit) {
                    vis.los |= bit;
                    vis.prev_los |= bit;
                }
                self.ghosts.on_unit_entered_los(ally, unit);
            }
            RenderEvent::UnitLeftLos { unit, ally } => {
                let Some(bit) = self.checked_ally_bit(ally) else { return };
                let in_radar = self.visibility.get_mut(&unit).map_or(false, |vis| {
                    vis.los &= !bit;
                    vis.radar & bit != 0
                });
                if let Some(unit) = units.unit(unit) {
                    self.ghosts.on_unit_left_los(ally, unit, in_radar);
                }
            }
            RenderEvent::UnitEnteredRadar { unit, ally } => self.set_radar(unit, ally, true),
            RenderEvent::UnitLeftRadar { unit, ally } => self.set_radar(unit, ally, false),
            RenderEvent::UnitCloaked { unit } => self.set_cloaked(unit, true),
            RenderEvent::UnitDecloaked { unit } => self.set_cloaked(unit, false),
            RenderEvent::PlayerChanged { ally, full_view } => {
                log::info!("Drawing for ally team {} (full view: {})", ally, full_view);
                self.viewer = Viewer { ally, full_view };
            }
            RenderEvent::SunChanged => self.sun_changed.set(true),
        }
    }

    fn checked_ally_bit(&self, ally: AllyTeamId) -> Option<u64> {
        let bit = ally_bit(ally);
        if bit.is_none() {
            log::warn!("Ignoring event for ally team {} (max {})", ally, MAX_ALLY_TEAMS);
        }
        bit
    }

    fn on_unit_created(&mut self, unit: UnitId, cloaked: bool, units: &dyn UnitSource) {
        if self.visibility.contains_key(&unit) {
            log::warn!("Unit {:?} created twice, ignoring", unit);
            return;
        }

        let mut vis = UnitVisibility {
            cloaked,
            ..Default::default()
        };
        // Units are always visible to their own ally team.
        if let Some(bit) = units.unit(unit).and_then(|u| ally_bit(u.ally_team)) {
            vis.los |= bit;
            vis.prev_los |= bit;
        }

        self.visibility.insert(unit, vis);
        self.unsorted_units.push(unit);
    }

    fn on_unit_destroyed(&mut self, unit: UnitId) {
        match self.visibility.remove(&unit) {
            Some(vis) => {
                self.leave_slot(unit, vis.slot);
                self.unsorted_units.retain(|u| *u != unit);
            }
            None => log::warn!("Destroyed unit {:?} was never created", unit),
        }
        self.icons.forget(unit);
        self.ghosts.on_unit_destroyed(unit, self.frame);
        self.missing_models.forget(unit);
    }

    fn set_radar(&mut self, unit: UnitId, ally: AllyTeamId, in_radar: bool) {
        let Some(bit) = self.checked_ally_bit(ally) else { return };
        if let Some(vis) = self.visibility.get_mut(&unit) {
            if in_radar {
                vis.radar |= bit;
            } else {
                vis.radar &= !bit;
            }
        }
        self.ghosts.set_in_radar(ally, unit, in_radar);
    }

    fn set_cloaked(&mut self, unit: UnitId, cloaked: bool) {
        if let Some(vis) = self.visibility.get_mut(&unit) {
            vis.cloaked = cloaked;
        }
    }

    /// Per-frame update: apply queued events, then re-place every unit
    pub fn update(&mut self, ctx: &FrameContext<'_>) {
        self.frame = ctx.frame;
        for event in self.events.drain() {
            self.handle_event(event, ctx.units);
        }

        self.icons.update_camera(ctx.camera, ctx.ground);

        for i in 0..self.unsorted_units.len() {
            let id = self.unsorted_units[i];
            let Some(unit) = ctx.units.unit(id) else {
                log::trace!("Unit {:?} missing from the unit source", id);
                continue;
            };
            let placement = self.classify(unit, ctx.camera);
            self.place(unit, placement);
        }

        let expired = self.ghosts.expire_dead(ctx.frame, self.config.dead_ghost_lifetime);
        if expired > 0 {
            log::debug!("Expired {} dead ghosts", expired);
        }
    }

    fn classify(&self, unit: &Unit, camera: &Camera) -> Placement {
        let Some(vis) = self.visibility.get(&unit.id) else {
            return Placement::Hidden;
        };
        let ally = self.viewer.ally;
        let bit = ally_bit(ally).unwrap_or(0);
        let in_los = self.viewer.full_view || vis.los & bit != 0;
        let in_radar = vis.radar & bit != 0;

        if !in_los && (!in_radar || self.ghosts.has_live(ally, unit.id)) {
            return Placement::Hidden;
        }
        if in_los && unit.model.is_none() {
            warn_once!(self.missing_models, unit.id, "Unit {:?} has no model, not drawn", unit.id);
            return Placement::Hidden;
        }

        let mut force = ForceIcon::empty();
        if unit.always_icon {
            force |= ForceIcon::UNIT_TYPE;
        }
        if !in_los {
            force |= ForceIcon::RADAR_BLIP;
        }

        let sq_dist = camera.distance_squared(&unit.position);
        if self.icons.draw_as_icon(force, &unit.icon, sq_dist) {
            let as_radar_blip = force.contains(ForceIcon::RADAR_BLIP);
            let icon = if as_radar_blip && vis.prev_los & bit == 0 {
                self.icons.radar_icon()
            } else {
                unit.icon
            };
            return Placement::Icon(IconState { icon, as_radar_blip });
        }

        match unit.model {
            Some(_) if sq_dist > self.unit_draw_dist_sqr => Placement::Hidden,
            Some(model) if vis.cloaked => Placement::Alpha(model),
            Some(model) => Placement::Opaque(model),
            None => Placement::Hidden,
        }
    }

    fn place(&mut self, unit: &Unit, placement: Placement) {
        let slot = match &placement {
            Placement::Hidden => DrawSlot::Hidden,
            Placement::Opaque(model) => DrawSlot::Opaque {
                model_type: model.model_type,
                texture_type: model.texture_type,
            },
            Placement::Alpha(model) => DrawSlot::Alpha {
                model_type: model.model_type,
                texture_type: model.texture_type,
            },
            Placement::Icon(_) => DrawSlot::Icon,
        };

        let Some(vis) = self.visibility.get_mut(&unit.id) else { return };
        let previous = std::mem::replace(&mut vis.slot, slot);

        if previous != slot {
            self.leave_slot(unit.id, previous);
            match slot {
                DrawSlot::Opaque { model_type, texture_type } => {
                    self.opaque_containers[model_type.index()].add(unit.id, texture_type);
                }
                DrawSlot::Alpha { model_type, texture_type } => {
                    self.alpha_containers[model_type.index()].add(unit.id, texture_type);
                }
                DrawSlot::Icon | DrawSlot::Hidden => {}
            }
        }

        if let Placement::Icon(state) = placement {
            self.icons.assign(unit.id, state);
            self.icons.update_anchor(unit);
        }
    }

    fn leave_slot(&mut self, unit: UnitId, slot: DrawSlot) {
        match slot {
            DrawSlot::Hidden => {}
            DrawSlot::Opaque { model_type, texture_type } => {
                self.opaque_containers[model_type.index()].remove(unit, texture_type);
            }
            DrawSlot::Alpha { model_type, texture_type } => {
                self.alpha_containers[model_type.index()].remove(unit, texture_type);
            }
            DrawSlot::Icon => {
                self.icons.remove(unit);
            }
        }
    }

    /// Queue a temporary preview unit
    ///
    /// Returns false if its timeout had already run out.
    pub fn add_temp_draw_unit(&mut self, unit: TempDrawUnit) -> bool {
        self.temp_units.add(unit)
    }

    /// Age temporary units by one simulation tick
    pub fn update_temp_units(&mut self) -> usize {
        self.temp_units.age_and_prune()
    }

    /// Release dead ghosts whose spot every ally team can see again
    pub fn update_ghosted_buildings(&mut self, los: &dyn LosQuery) -> usize {
        (0..MAX_ALLY_TEAMS)
            .map(|ally| self.ghosts.update_ghosted_buildings(ally, los))
            .sum()
    }

    /// Link a ground decal to a ghost
    pub fn link_ghost_decal(&mut self, ghost: GhostKey, decal: DecalId) {
        self.ghosts.link_decal(ghost, decal);
    }

    /// The decal system let go of a ghost
    pub fn release_ghost_decal(&mut self, ghost: GhostKey) {
        self.ghosts.release_decal(ghost);
    }

    /// Drop every ghost, live and dead, for all ally teams
    ///
    /// Used when the map is reloaded; decals linked to ghosts must be dropped
    /// by their owner as well.
    pub fn clear_ghosts(&mut self) {
        log::debug!("Clearing {} ghosts", self.ghosts.len());
        self.ghosts.clear();
    }

    /// Every unit known to the drawer, in creation order
    pub fn unsorted_units(&self) -> &[UnitId] {
        &self.unsorted_units
    }

    /// Opaque container of `model_type`
    pub fn opaque_container(&self, model_type: ModelType) -> &ModelRenderContainer {
        &self.opaque_containers[model_type.index()]
    }

    /// Alpha container of `model_type`
    pub fn alpha_container(&self, model_type: ModelType) -> &ModelRenderContainer {
        &self.alpha_containers[model_type.index()]
    }

    /// Ghost registry
    pub fn ghosts(&self) -> &GhostRegistry {
        &self.ghosts
    }

    /// Temporary unit pool
    pub fn temp_units(&self) -> &TempUnitPool {
        &self.temp_units
    }

    /// Icon classifier and groups
    pub fn icons(&self) -> &IconClassifier {
        &self.icons
    }

    /// Icon groups in icon order
    pub fn icon_groups(&self) -> impl Iterator<Item = (IconId, &[UnitId])> {
        self.icons.groups()
    }

    /// Where `unit` was placed by the last update
    pub fn draw_slot(&self, unit: UnitId) -> Option<DrawSlot> {
        self.visibility.get(&unit).map(|vis| vis.slot)
    }

    /// Frame number of the last update
    pub fn frame(&self) -> u32 {
        self.frame
    }
}

impl Default for UnitDrawer {
    fn default() -> Self {
        Self::new(DrawerConfig::default())
    }
}

impl std::fmt::Debug for UnitDrawer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitDrawer")
            .field("units", &self.unsorted_units.len())
            .field("icons", &self.icons.len())
            .field("ghosts", &self.ghosts.len())
            .field("temp_units", &self.temp_units.len())
            .field("viewer", &self.viewer)
            .field("drawer_state", &self.drawer_states.active_kind())
            .finish()
    }
}
