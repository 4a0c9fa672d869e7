//! Recording backend
//!
//! A [`UnitRenderBackend`] that performs no GPU work and records every call.
//! Tests use it to check push/pop balance and draw sets; debug overlays can
//! use it to inspect what a frame would submit.

use crate::foundation::math::Vec3;
use crate::scene::{IconId, ModelRef, ModelType, TeamId};
use super::backend::{DrawSource, IconVertex, ModelDraw, PassKind, UnitRenderBackend};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    /// `push_pass_state`
    PushPass(PassKind, bool),
    /// `pop_pass_state`
    PopPass(PassKind, bool),
    /// `push_model_state`
    PushModel(ModelType, bool),
    /// `pop_model_state`
    PopModel(ModelType),
    /// `bind_model_texture`
    BindTexture(ModelType, u32),
    /// `enable_unit_shader`
    EnableShader(bool, bool),
    /// `disable_unit_shader`
    DisableShader(bool),
    /// `set_team_colour`
    TeamColour(TeamId, f32, bool),
    /// `set_wire_frame`
    WireFrame(bool),
    /// `draw_model`, tagged with the innermost pass
    Draw(Option<PassKind>, ModelDraw),
    /// `draw_icons`
    Icons(IconId, Vec<IconVertex>),
    /// `draw_build_outline`
    BuildOutline(Vec3, ModelRef, i32),
    /// `refresh_lighting`
    RefreshLighting,
}

/// Backend that records calls instead of drawing
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    pass_stack: Vec<PassKind>,
    model_depth: usize,
    shader_depth: usize,
}

impl RecordingBackend {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls in submission order
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Forget recorded calls (nesting state is kept)
    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// Number of pass and model state pushes
    pub fn push_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, BackendCall::PushPass(..) | BackendCall::PushModel(..)))
            .count()
    }

    /// Number of pass and model state pops
    pub fn pop_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, BackendCall::PopPass(..) | BackendCall::PopModel(..)))
            .count()
    }

    /// True when every push, and every shader enable, has been undone
    pub fn is_balanced(&self) -> bool {
        self.pass_stack.is_empty()
            && self.model_depth == 0
            && self.shader_depth == 0
            && self.push_count() == self.pop_count()
    }

    /// Passes entered, in order
    pub fn passes(&self) -> Vec<PassKind> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::PushPass(pass, _) => Some(*pass),
                _ => None,
            })
            .collect()
    }

    /// Model draws issued inside `pass`
    pub fn draws_in(&self, pass: PassKind) -> Vec<&ModelDraw> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::Draw(Some(p), draw) if *p == pass => Some(draw),
                _ => None,
            })
            .collect()
    }

    /// Sources of the model draws issued inside `pass`
    pub fn sources_in(&self, pass: PassKind) -> Vec<DrawSource> {
        self.draws_in(pass).into_iter().map(|d| d.source).collect()
    }

    /// Icon batches drawn, as (icon, quad count)
    pub fn icon_batches(&self) -> Vec<(IconId, usize)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::Icons(icon, vertices) => Some((*icon, vertices.len() / 4)),
                _ => None,
            })
            .collect()
    }

    /// Number of times `call` was recorded
    pub fn count(&self, call: &BackendCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl UnitRenderBackend for RecordingBackend {
    fn push_pass_state(&mut self, pass: PassKind, deferred: bool) {
        self.pass_stack.push(pass);
        self.calls.push(BackendCall::PushPass(pass, deferred));
    }

    fn pop_pass_state(&mut self, pass: PassKind, deferred: bool) {
        let top = self.pass_stack.pop();
        debug_assert_eq!(top, Some(pass), "pass state popped out of order");
        self.calls.push(BackendCall::PopPass(pass, deferred));
    }

    fn push_model_state(&mut self, model_type: ModelType, cull_faces: bool) {
        self.model_depth += 1;
        self.calls.push(BackendCall::PushModel(model_type, cull_faces));
    }

    fn pop_model_state(&mut self, model_type: ModelType) {
        self.model_depth = self.model_depth.saturating_sub(1);
        self.calls.push(BackendCall::PopModel(model_type));
    }

    fn bind_model_texture(&mut self, model_type: ModelType, texture_type: u32) {
        self.calls.push(BackendCall::BindTexture(model_type, texture_type));
    }

    fn enable_unit_shader(&mut self, deferred: bool, alpha_pass: bool) {
        self.shader_depth += 1;
        self.calls.push(BackendCall::EnableShader(deferred, alpha_pass));
    }

    fn disable_unit_shader(&mut self, deferred: bool) {
        self.shader_depth = self.shader_depth.saturating_sub(1);
        self.calls.push(BackendCall::DisableShader(deferred));
    }

    fn set_team_colour(&mut self, team: TeamId, alpha: f32, alpha_pass: bool) {
        self.calls.push(BackendCall::TeamColour(team, alpha, alpha_pass));
    }

    fn set_wire_frame(&mut self, enabled: bool) {
        self.calls.push(BackendCall::WireFrame(enabled));
    }

    fn draw_model(&mut self, draw: &ModelDraw) {
        let pass = self.pass_stack.last().copied();
        self.calls.push(BackendCall::Draw(pass, draw.clone()));
    }

    fn draw_icons(&mut self, icon: IconId, vertices: &[IconVertex]) {
        self.calls.push(BackendCall::Icons(icon, vertices.to_vec()));
    }

    fn draw_build_outline(&mut self, position: Vec3, model: &ModelRef, facing: i32) {
        self.calls.push(BackendCall::BuildOutline(position, *model, facing));
    }

    fn refresh_lighting(&mut self) {
        self.calls.push(BackendCall::RefreshLighting);
    }
}
