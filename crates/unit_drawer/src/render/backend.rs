//! Backend abstraction traits for the unit drawer
//!
//! The drawer configures GPU state but does not implement it. A backend
//! (GL, Vulkan, or the recording backend used by tests) receives paired
//! push/pop calls for pass and model-type state, texture bindings and the
//! individual draw calls.
//!
//! Pairing is the drawer's job: every `push_*` is issued by a scope guard in
//! [`crate::render::scope`] whose `Drop` issues the matching `pop_*`.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{Mat4, Vec3};
use crate::scene::{IconId, ModelRef, ModelType, TeamId, UnitId};

/// One full sweep of drawing with a particular GPU configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Depth-writing opaque geometry (forward or deferred)
    Opaque,
    /// Blended geometry: cloaked units and alpha previews
    Alpha,
    /// Shadow map rendering
    Shadow,
    /// Screen-aligned unit icons
    Icon,
}

impl PassKind {
    /// True for passes that write color with blending
    pub fn is_alpha(&self) -> bool {
        matches!(self, PassKind::Alpha)
    }
}

/// Which model-drawing routine a draw goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    /// Complete model
    Full,
    /// Unit under construction, opaque pass (clipped at build height)
    BeingBuiltOpaque,
    /// Unit under construction, shadow pass
    BeingBuiltShadow,
}

/// What a model draw represents, for debugging and statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawSource {
    /// A live unit from a render container
    Unit(UnitId),
    /// A live ghost of the given unit
    LiveGhost(UnitId),
    /// A dead ghost (the unit no longer exists)
    DeadGhost,
    /// A temporary preview unit
    Temp,
    /// A caller-initiated single-unit draw
    Individual(UnitId),
}

/// A single model draw
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDraw {
    /// Model to draw
    pub model: ModelRef,
    /// Model-to-world transform
    pub transform: Mat4,
    /// Drawing routine
    pub mode: DrawMode,
    /// Build clip height above the model base, for being-built draws
    pub clip_height: Option<f32>,
    /// What is being drawn
    pub source: DrawSource,
}

/// Icon vertex: position, texture coordinate and team colour
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct IconVertex {
    /// World position
    pub position: [f32; 3],
    /// Atlas texture coordinate
    pub uv: [f32; 2],
    /// RGBA colour
    pub color: [u8; 4],
}

/// Opaque handle to the deferred-shading geometry buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryBufferHandle(pub u64);

/// GPU state and draw submission interface the drawer talks to
pub trait UnitRenderBackend {
    /// Push global state for a pass (depth write, blending, shader family)
    fn push_pass_state(&mut self, pass: PassKind, deferred: bool);

    /// Restore the state saved by the matching [`push_pass_state`](Self::push_pass_state)
    fn pop_pass_state(&mut self, pass: PassKind, deferred: bool);

    /// Push model-type specific state (vertex format, face culling)
    fn push_model_state(&mut self, model_type: ModelType, cull_faces: bool);

    /// Restore the state saved by the matching [`push_model_state`](Self::push_model_state)
    fn pop_model_state(&mut self, model_type: ModelType);

    /// Bind the textures of one texture set
    fn bind_model_texture(&mut self, model_type: ModelType, texture_type: u32);

    /// Enable the unit shader
    fn enable_unit_shader(&mut self, deferred: bool, alpha_pass: bool);

    /// Disable the unit shader
    fn disable_unit_shader(&mut self, deferred: bool);

    /// Set team colour and alpha for the following draws
    fn set_team_colour(&mut self, team: TeamId, alpha: f32, alpha_pass: bool);

    /// Toggle wireframe rasterization
    fn set_wire_frame(&mut self, enabled: bool);

    /// Draw one model
    fn draw_model(&mut self, draw: &ModelDraw);

    /// Draw a batch of icon quads that all use `icon`
    fn draw_icons(&mut self, icon: IconId, vertices: &[IconVertex]);

    /// Draw the footprint outline of a placement preview
    fn draw_build_outline(&mut self, position: Vec3, model: &ModelRef, facing: i32);

    /// Re-upload sun and lighting parameters
    fn refresh_lighting(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<IconVertex>(), 24);
        let vertices = [IconVertex::zeroed(); 4];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 96);
    }

    #[test]
    fn test_only_alpha_pass_is_alpha() {
        assert!(PassKind::Alpha.is_alpha());
        assert!(!PassKind::Opaque.is_alpha());
        assert!(!PassKind::Shadow.is_alpha());
    }
}
