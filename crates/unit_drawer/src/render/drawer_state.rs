//! Drawer states
//!
//! A drawer state is a named GPU pipeline configuration for unit drawing.
//! There is a fixed set of them; [`DrawerStateSelector`] owns all of them and
//! records which one is active as an enum tag, so "selecting" never copies or
//! destroys a configuration.

use crate::scene::TeamId;
use super::backend::{PassKind, UnitRenderBackend};

/// The fixed set of drawer states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawerStateKind {
    /// No-op path: draws nothing special, cannot draw alpha
    Null,
    /// Default shader path
    Shader,
}

impl DrawerStateKind {
    /// All states in storage order
    pub const ALL: [DrawerStateKind; 2] = [DrawerStateKind::Null, DrawerStateKind::Shader];

    const fn index(self) -> usize {
        match self {
            DrawerStateKind::Null => 0,
            DrawerStateKind::Shader => 1,
        }
    }
}

/// GPU configuration used while drawing units
pub trait UnitDrawerState {
    /// Which state this is
    fn kind(&self) -> DrawerStateKind;

    /// Whether this state can be enabled with the current backend
    fn can_enable(&self) -> bool;

    /// Whether this state can draw the alpha pass
    fn can_draw_alpha(&self) -> bool;

    /// Enable the state for a pass
    fn enable(&self, backend: &mut dyn UnitRenderBackend, deferred: bool, alpha_pass: bool);

    /// Disable the state
    fn disable(&self, backend: &mut dyn UnitRenderBackend, deferred: bool);

    /// Set team colour and alpha for subsequent draws
    fn set_team_colour(&self, backend: &mut dyn UnitRenderBackend, team: TeamId, alpha: f32, alpha_pass: bool);
}

/// No-op drawer state
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDrawerState;

impl UnitDrawerState for NullDrawerState {
    fn kind(&self) -> DrawerStateKind {
        DrawerStateKind::Null
    }

    fn can_enable(&self) -> bool {
        true
    }

    fn can_draw_alpha(&self) -> bool {
        false
    }

    fn enable(&self, _backend: &mut dyn UnitRenderBackend, _deferred: bool, _alpha_pass: bool) {}

    fn disable(&self, _backend: &mut dyn UnitRenderBackend, _deferred: bool) {}

    fn set_team_colour(&self, _backend: &mut dyn UnitRenderBackend, _team: TeamId, _alpha: f32, _alpha_pass: bool) {}
}

/// Default shader drawer state
#[derive(Debug, Default, Clone, Copy)]
pub struct ShaderDrawerState;

impl UnitDrawerState for ShaderDrawerState {
    fn kind(&self) -> DrawerStateKind {
        DrawerStateKind::Shader
    }

    fn can_enable(&self) -> bool {
        true
    }

    fn can_draw_alpha(&self) -> bool {
        true
    }

    fn enable(&self, backend: &mut dyn UnitRenderBackend, deferred: bool, alpha_pass: bool) {
        backend.enable_unit_shader(deferred, alpha_pass);
    }

    fn disable(&self, backend: &mut dyn UnitRenderBackend, deferred: bool) {
        backend.disable_unit_shader(deferred);
    }

    fn set_team_colour(&self, backend: &mut dyn UnitRenderBackend, team: TeamId, alpha: f32, alpha_pass: bool) {
        backend.set_team_colour(team, alpha, alpha_pass);
    }
}

/// Owns every drawer state and tracks the active one
pub struct DrawerStateSelector {
    states: [Box<dyn UnitDrawerState>; 2],
    active: DrawerStateKind,
}

impl DrawerStateSelector {
    /// Create the selector with the shader state active
    pub fn new() -> Self {
        Self {
            states: [Box::new(NullDrawerState), Box::new(ShaderDrawerState)],
            active: DrawerStateKind::Shader,
        }
    }

    /// State stored under `kind`
    pub fn get(&self, kind: DrawerStateKind) -> &dyn UnitDrawerState {
        self.states[kind.index()].as_ref()
    }

    /// Make `kind` the active state
    pub fn select(&mut self, kind: DrawerStateKind) -> &dyn UnitDrawerState {
        log::debug!("Selecting {:?} drawer state", kind);
        self.active = kind;
        self.get(kind)
    }

    /// Tag of the active state
    pub fn active_kind(&self) -> DrawerStateKind {
        self.active
    }

    /// The active state
    pub fn active(&self) -> &dyn UnitDrawerState {
        self.get(self.active)
    }

    /// Capability check run before entering `pass` with the active state
    ///
    /// # Panics
    /// If the active state cannot be enabled or cannot draw the alpha pass.
    pub fn ensure_capable(&self, pass: PassKind) -> &dyn UnitDrawerState {
        let state = self.active();
        assert!(state.can_enable(), "{:?} drawer state cannot be enabled", state.kind());
        assert!(
            !pass.is_alpha() || state.can_draw_alpha(),
            "{:?} drawer state cannot draw the {:?} pass",
            state.kind(),
            pass
        );
        state
    }
}

impl Default for DrawerStateSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DrawerStateSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawerStateSelector")
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::{BackendCall, RecordingBackend};

    #[test]
    fn test_select_aliases_without_replacing() {
        let mut selector = DrawerStateSelector::new();
        assert_eq!(selector.active_kind(), DrawerStateKind::Shader);

        selector.select(DrawerStateKind::Null);
        assert_eq!(selector.active().kind(), DrawerStateKind::Null);

        // Both configurations are still present under their own tags.
        for kind in DrawerStateKind::ALL {
            assert_eq!(selector.get(kind).kind(), kind);
        }
    }

    #[test]
    #[should_panic(expected = "cannot draw the Alpha pass")]
    fn test_null_state_cannot_enter_alpha_pass() {
        let mut selector = DrawerStateSelector::new();
        selector.select(DrawerStateKind::Null);
        selector.ensure_capable(PassKind::Alpha);
    }

    #[test]
    fn test_null_state_is_silent() {
        let mut backend = RecordingBackend::new();
        let state = NullDrawerState;
        state.enable(&mut backend, false, false);
        state.set_team_colour(&mut backend, 1, 1.0, false);
        state.disable(&mut backend, false);
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_shader_state_forwards_to_backend() {
        let mut backend = RecordingBackend::new();
        let state = ShaderDrawerState;
        state.enable(&mut backend, true, false);
        state.set_team_colour(&mut backend, 3, 0.5, true);
        state.disable(&mut backend, true);
        assert_eq!(
            backend.calls(),
            &[
                BackendCall::EnableShader(true, false),
                BackendCall::TeamColour(3, 0.5, true),
                BackendCall::DisableShader(true),
            ]
        );
    }
}
