//! Frame passes
//!
//! A frame draws, in order: the opaque pass (deferred and/or forward), the
//! alpha pass, the shadow pass and the icon pass. The alpha pass is skipped
//! when nothing transparent is queued and the shadow pass when shadows are
//! off; no other reordering is allowed.
//!
//! Every pass nests the same guards: pass state, then drawer state, then
//! model-type state for each model type in draw order, with one texture bind
//! per texture batch.

use crate::foundation::math::{Mat4, Mat4Ext};
use crate::render::backend::{DrawMode, DrawSource, ModelDraw, PassKind, UnitRenderBackend};
use crate::render::drawer_state::UnitDrawerState;
use crate::render::model_renderer::{renderer_for, ModelTypeRenderer};
use crate::render::scope::{DrawerStateScope, ModelStateScope, PassScope};
use crate::scene::{Camera, GroundQuery, ModelRef, ModelType, TeamId, Unit, UnitSource};

use super::culling::{can_draw_unit, can_draw_unit_shadow, ViewMode};
use super::hooks::DrawHooks;
use super::UnitDrawer;

/// Inputs shared by update and draw for one frame
#[derive(Clone, Copy)]
pub struct FrameContext<'a> {
    /// Frame number
    pub frame: u32,
    /// Player camera
    pub camera: &'a Camera,
    /// Sun camera of the shadow pass, if shadows use one
    pub shadow_camera: Option<&'a Camera>,
    /// Unit lookup
    pub units: &'a dyn UnitSource,
    /// Ground height lookup
    pub ground: &'a dyn GroundQuery,
}

impl<'a> FrameContext<'a> {
    /// Context without a shadow camera
    pub fn new(frame: u32, camera: &'a Camera, units: &'a dyn UnitSource, ground: &'a dyn GroundQuery) -> Self {
        Self {
            frame,
            camera,
            shadow_camera: None,
            units,
            ground,
        }
    }

    /// Builder-style shadow camera
    pub fn with_shadow_camera(mut self, camera: &'a Camera) -> Self {
        self.shadow_camera = Some(camera);
        self
    }
}

/// Position within a frame's pass sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FramePhase {
    /// Between frames
    #[default]
    Idle,
    /// Opaque pass
    Opaque,
    /// Alpha pass
    Alpha,
    /// Shadow pass
    Shadow,
    /// Icon pass
    Icon,
}

impl FramePhase {
    /// True if a frame may go from `self` straight to `next`
    pub fn can_advance_to(self, next: FramePhase) -> bool {
        use FramePhase::{Alpha, Icon, Idle, Opaque, Shadow};
        matches!(
            (self, next),
            (Idle, Opaque)
                | (Opaque, Alpha | Shadow | Icon)
                | (Alpha, Shadow | Icon)
                | (Shadow, Icon)
                | (Icon, Idle)
        )
    }
}

/// Draw mode and build clip height for `unit` in `pass`
fn build_mode(unit: &Unit, model: &ModelRef, pass: PassKind) -> (DrawMode, Option<f32>) {
    if !unit.is_being_built() {
        return (DrawMode::Full, None);
    }
    let clip_height = Some(model.height * unit.build_progress.max(0.0));
    match pass {
        PassKind::Opaque => (DrawMode::BeingBuiltOpaque, clip_height),
        PassKind::Shadow => (DrawMode::BeingBuiltShadow, clip_height),
        PassKind::Alpha | PassKind::Icon => (DrawMode::Full, None),
    }
}

fn unit_transform(hooks: Option<&dyn DrawHooks>, unit: &Unit) -> Mat4 {
    hooks
        .and_then(|h| h.override_transform(unit))
        .unwrap_or_else(|| Mat4::from_position_direction(unit.position, unit.direction))
}

impl UnitDrawer {
    /// Phase of the frame being drawn
    pub fn frame_phase(&self) -> FramePhase {
        self.phase.get()
    }

    pub(super) fn enter_phase(&self, next: FramePhase) {
        let current = self.phase.get();
        assert!(
            current.can_advance_to(next),
            "illegal frame phase transition {:?} -> {:?}",
            current,
            next
        );
        self.phase.set(next);
    }

    fn nothing_transparent(&self) -> bool {
        self.alpha_containers.iter().all(|c| c.is_empty()) && self.temp_units.alpha_is_empty()
    }

    /// Draw one frame
    ///
    /// # Panics
    /// If the active drawer state cannot draw a pass the frame needs, or if
    /// called again while a frame is being drawn.
    pub fn draw(&self, backend: &mut dyn UnitRenderBackend, ctx: &FrameContext<'_>) {
        if self.sun_changed.take() {
            backend.refresh_lighting();
        }

        self.enter_phase(FramePhase::Opaque);
        if self.config.draw_deferred && self.geometry_buffer.is_some() {
            self.draw_opaque_pass(backend, ctx, true, ViewMode::Normal);
        }
        if self.config.draw_forward {
            self.draw_opaque_pass(backend, ctx, false, ViewMode::Normal);
        }

        if !(self.config.skip_empty_alpha_pass && self.nothing_transparent()) {
            self.enter_phase(FramePhase::Alpha);
            self.draw_alpha_pass(backend, ctx);
        }

        if self.config.shadows_enabled {
            self.enter_phase(FramePhase::Shadow);
            self.draw_shadow_pass(backend, ctx);
        }

        self.enter_phase(FramePhase::Icon);
        self.draw_icon_pass(backend, ctx);

        self.enter_phase(FramePhase::Idle);
    }

    /// Opaque pass: model containers, opaque temp units and ghosts
    ///
    /// Reflection and refraction views skip ghosts.
    pub fn draw_opaque_pass(&self, backend: &mut dyn UnitRenderBackend, ctx: &FrameContext<'_>, deferred: bool, mode: ViewMode) {
        let state = self.drawer_states.ensure_capable(PassKind::Opaque);
        let wire_frame = self.config.wire_frame_mode;

        let mut pass = PassScope::new(backend, PassKind::Opaque, deferred);
        if wire_frame {
            pass.set_wire_frame(true);
        }

        {
            let mut shaded = DrawerStateScope::new(&mut *pass, state, deferred, false);
            for model_type in ModelType::ALL {
                let mut scope = ModelStateScope::new(&mut *shaded, model_type);
                self.draw_opaque_units(&mut scope, state, model_type, ctx, mode);
                self.draw_opaque_temp_units(&mut scope, state, model_type);
                if mode == ViewMode::Normal {
                    self.draw_ghosts(&mut scope, state, model_type, ctx);
                }
            }
        }

        if wire_frame {
            pass.set_wire_frame(false);
        }
    }

    fn draw_opaque_units(
        &self,
        scope: &mut ModelStateScope<'_>,
        state: &dyn UnitDrawerState,
        model_type: ModelType,
        ctx: &FrameContext<'_>,
        mode: ViewMode,
    ) {
        let renderer = scope.renderer();
        for (texture_type, units) in self.opaque_containers[model_type.index()].batches() {
            scope.bind_texture(texture_type);
            for id in units {
                let Some(unit) = ctx.units.unit(*id) else { continue };
                if !can_draw_unit(unit, ctx.camera, mode, ctx.ground) {
                    continue;
                }
                self.draw_container_unit(&mut **scope, renderer, Some((state, 1.0)), unit, PassKind::Opaque);
            }
        }
    }

    fn draw_opaque_temp_units(&self, scope: &mut ModelStateScope<'_>, state: &dyn UnitDrawerState, model_type: ModelType) {
        let renderer = scope.renderer();
        for temp in self.temp_units.opaque(model_type) {
            scope.bind_texture(temp.model.texture_type);
            state.set_team_colour(&mut **scope, temp.team, 1.0, false);
            renderer.draw(
                &mut **scope,
                &ModelDraw {
                    model: temp.model,
                    transform: temp.transform(),
                    mode: DrawMode::Full,
                    clip_height: None,
                    source: DrawSource::Temp,
                },
            );
        }
    }

    fn draw_ghosts(&self, scope: &mut ModelStateScope<'_>, state: &dyn UnitDrawerState, model_type: ModelType, ctx: &FrameContext<'_>) {
        if self.viewer.full_view {
            return;
        }

        let ally = self.viewer.ally;
        let alphas = self.config.alpha_values;
        let renderer = scope.renderer();

        let live = self.ghosts.live(ally, model_type).map(|(_, ghost)| {
            let alpha = if ghost.in_radar(ally) {
                alphas.ghost_in_radar
            } else {
                alphas.ghost_out_of_radar
            };
            (ghost, DrawSource::LiveGhost(ghost.unit), alpha)
        });
        let dead = self
            .ghosts
            .dead(ally, model_type)
            .map(|(_, ghost)| (ghost, DrawSource::DeadGhost, alphas.ghost_out_of_radar));

        for (ghost, source, alpha) in live.chain(dead) {
            if !ctx.camera.in_view(&ghost.position, ghost.model.radius) {
                continue;
            }
            scope.bind_texture(ghost.model.texture_type);
            state.set_team_colour(&mut **scope, ghost.team, alpha, false);
            renderer.draw(
                &mut **scope,
                &ModelDraw {
                    model: ghost.model,
                    transform: Mat4::from_position_direction(ghost.position, ghost.direction),
                    mode: DrawMode::Full,
                    clip_height: None,
                    source,
                },
            );
            ghost.mark_drawn(ctx.frame);
        }
    }

    /// Alpha pass: cloaked units and transparent temp units
    ///
    /// # Panics
    /// If the active drawer state cannot draw alpha.
    pub fn draw_alpha_pass(&self, backend: &mut dyn UnitRenderBackend, ctx: &FrameContext<'_>) {
        let state = self.drawer_states.ensure_capable(PassKind::Alpha);
        let alphas = self.config.alpha_values;

        let mut pass = PassScope::new(backend, PassKind::Alpha, false);
        let mut shaded = DrawerStateScope::new(&mut *pass, state, false, true);

        for model_type in ModelType::ALL {
            let mut scope = ModelStateScope::new(&mut *shaded, model_type);
            let renderer = scope.renderer();

            for (texture_type, units) in self.alpha_containers[model_type.index()].batches() {
                scope.bind_texture(texture_type);
                for id in units {
                    let Some(unit) = ctx.units.unit(*id) else { continue };
                    if !can_draw_unit(unit, ctx.camera, ViewMode::Normal, ctx.ground) {
                        continue;
                    }
                    self.draw_container_unit(&mut *scope, renderer, Some((state, alphas.regular)), unit, PassKind::Alpha);
                }
            }

            for temp in self.temp_units.alpha(model_type) {
                scope.bind_texture(temp.model.texture_type);
                state.set_team_colour(&mut *scope, temp.team, alphas.temp_unit, true);
                renderer.draw(
                    &mut *scope,
                    &ModelDraw {
                        model: temp.model,
                        transform: temp.transform(),
                        mode: DrawMode::Full,
                        clip_height: None,
                        source: DrawSource::Temp,
                    },
                );
                if temp.draw_border {
                    scope.draw_build_outline(temp.position, &temp.model, temp.facing);
                }
            }
        }
    }

    /// Shadow pass: opaque units that may cast a shadow into view
    ///
    /// Cloaked units cast no shadow.
    pub fn draw_shadow_pass(&self, backend: &mut dyn UnitRenderBackend, ctx: &FrameContext<'_>) {
        let mut pass = PassScope::new(backend, PassKind::Shadow, false);

        for model_type in ModelType::ALL {
            let mut scope = ModelStateScope::new(&mut *pass, model_type);
            let renderer = scope.renderer();

            for (texture_type, units) in self.opaque_containers[model_type.index()].batches() {
                scope.bind_texture(texture_type);
                for id in units {
                    let Some(unit) = ctx.units.unit(*id) else { continue };
                    if !can_draw_unit_shadow(unit, ctx.camera, ctx.shadow_camera, self.unit_draw_dist_sqr) {
                        continue;
                    }
                    self.draw_container_unit(&mut *scope, renderer, None, unit, PassKind::Shadow);
                }
            }
        }
    }

    /// Icon pass: one batched draw per icon group
    pub fn draw_icon_pass(&self, backend: &mut dyn UnitRenderBackend, ctx: &FrameContext<'_>) {
        let mut pass = PassScope::new(backend, PassKind::Icon, false);
        for (icon, members) in self.icons.groups() {
            let vertices = self.icons.build_quads(members, ctx.units, ctx.camera);
            if !vertices.is_empty() {
                pass.draw_icons(icon, &vertices);
            }
        }
    }

    fn draw_container_unit(
        &self,
        backend: &mut dyn UnitRenderBackend,
        renderer: &dyn ModelTypeRenderer,
        colour: Option<(&dyn UnitDrawerState, f32)>,
        unit: &Unit,
        pass: PassKind,
    ) {
        let Some(model) = unit.model else { return };
        let hooks = self.hooks.as_deref();
        if let Some(hooks) = hooks {
            if hooks.draw_unit(unit, pass, backend) {
                return;
            }
        }

        if let Some((state, alpha)) = colour {
            state.set_team_colour(backend, unit.team, alpha, pass.is_alpha());
        }
        let (mode, clip_height) = build_mode(unit, &model, pass);
        renderer.draw(
            backend,
            &ModelDraw {
                model,
                transform: unit_transform(hooks, unit),
                mode,
                clip_height,
                source: DrawSource::Unit(unit.id),
            },
        );
    }

    /// Open a single-unit opaque draw outside the frame sequence
    pub fn individual_opaque_scope<'a>(
        &'a self,
        backend: &'a mut dyn UnitRenderBackend,
        model: &ModelRef,
        team: TeamId,
    ) -> IndividualScope<'a> {
        IndividualScope::new(self, backend, model, team, PassKind::Opaque, 1.0)
    }

    /// Open a single-unit alpha draw outside the frame sequence
    ///
    /// # Panics
    /// If the active drawer state cannot draw alpha.
    pub fn individual_alpha_scope<'a>(
        &'a self,
        backend: &'a mut dyn UnitRenderBackend,
        model: &ModelRef,
        team: TeamId,
    ) -> IndividualScope<'a> {
        let alpha = self.config.alpha_values.regular;
        IndividualScope::new(self, backend, model, team, PassKind::Alpha, alpha)
    }
}

/// State for drawing single units of one model type
///
/// Pushes pass, drawer and model-type state on creation and pops all of it
/// when dropped.
pub struct IndividualScope<'a> {
    backend: &'a mut dyn UnitRenderBackend,
    state: &'a dyn UnitDrawerState,
    renderer: &'static dyn ModelTypeRenderer,
    hooks: Option<&'a dyn DrawHooks>,
    pass: PassKind,
    alpha: f32,
    pushed: Pushed,
}

/// How much of its state an [`IndividualScope`] has pushed so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Pushed {
    Nothing,
    Pass,
    DrawerState,
    ModelState,
}

impl<'a> IndividualScope<'a> {
    fn new(
        drawer: &'a UnitDrawer,
        backend: &'a mut dyn UnitRenderBackend,
        model: &ModelRef,
        team: TeamId,
        pass: PassKind,
        alpha: f32,
    ) -> Self {
        let state = drawer.drawer_states.ensure_capable(pass);
        let renderer = renderer_for(model.model_type);

        // The guard exists before the first push so a panicking backend
        // call only unwinds what was already pushed.
        let mut scope = Self {
            backend,
            state,
            renderer,
            hooks: drawer.hooks.as_deref(),
            pass,
            alpha,
            pushed: Pushed::Nothing,
        };
        scope.backend.push_pass_state(pass, false);
        scope.pushed = Pushed::Pass;
        state.enable(&mut *scope.backend, false, pass.is_alpha());
        scope.pushed = Pushed::DrawerState;
        renderer.push_state(&mut *scope.backend);
        scope.pushed = Pushed::ModelState;
        renderer.bind_texture(&mut *scope.backend, model.texture_type);
        scope.set_team(team);
        scope
    }

    /// Switch the team colour for subsequent draws
    pub fn set_team(&mut self, team: TeamId) {
        self.state.set_team_colour(&mut *self.backend, team, self.alpha, self.pass.is_alpha());
    }

    /// Draw `unit`, optionally letting script hooks supply the transform
    ///
    /// Returns false if the unit has no model or a model of another type.
    pub fn draw_unit(&mut self, unit: &Unit, use_hooks: bool) -> bool {
        let Some(model) = unit.model else { return false };
        if model.model_type != self.renderer.model_type() {
            log::warn!(
                "Unit {:?} is a {} model, scope was opened for {}",
                unit.id,
                model.model_type,
                self.renderer.model_type()
            );
            return false;
        }

        let hooks = if use_hooks { self.hooks } else { None };
        let (mode, clip_height) = build_mode(unit, &model, self.pass);
        self.renderer.draw(
            &mut *self.backend,
            &ModelDraw {
                model,
                transform: unit_transform(hooks, unit),
                mode,
                clip_height,
                source: DrawSource::Individual(unit.id),
            },
        );
        true
    }
}

impl Drop for IndividualScope<'_> {
    fn drop(&mut self) {
        if self.pushed >= Pushed::ModelState {
            self.renderer.pop_state(&mut *self.backend);
        }
        if self.pushed >= Pushed::DrawerState {
            self.state.disable(&mut *self.backend, false);
        }
        if self.pushed >= Pushed::Pass {
            self.backend.pop_pass_state(self.pass, false);
        }
    }
}
