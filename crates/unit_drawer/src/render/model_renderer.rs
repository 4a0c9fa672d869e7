//! Per-model-type rendering
//!
//! Model formats differ in how their textures are bound: 3DO models share a
//! single atlas and are drawn without face culling, S3O and Assimp models bind
//! a texture set per texture type. [`renderer_for`] picks the implementation
//! for a [`ModelType`].

use crate::scene::ModelType;
use super::backend::{ModelDraw, UnitRenderBackend};

/// Texture set bound once for every 3DO model
pub const THREE_DO_ATLAS: u32 = 0;

/// Draw capability for one model format
pub trait ModelTypeRenderer: Sync {
    /// Format handled by this renderer
    fn model_type(&self) -> ModelType;

    /// Push format-specific state
    fn push_state(&self, backend: &mut dyn UnitRenderBackend);

    /// Pop format-specific state
    fn pop_state(&self, backend: &mut dyn UnitRenderBackend);

    /// Bind the textures for `texture_type`
    fn bind_texture(&self, backend: &mut dyn UnitRenderBackend, texture_type: u32);

    /// Submit one model draw
    fn draw(&self, backend: &mut dyn UnitRenderBackend, draw: &ModelDraw) {
        debug_assert_eq!(draw.model.model_type, self.model_type());
        backend.draw_model(draw);
    }
}

/// Renderer for atlas-textured 3DO models
#[derive(Debug)]
pub struct ThreeDoRenderer;

impl ModelTypeRenderer for ThreeDoRenderer {
    fn model_type(&self) -> ModelType {
        ModelType::ThreeDo
    }

    fn push_state(&self, backend: &mut dyn UnitRenderBackend) {
        backend.push_model_state(ModelType::ThreeDo, false);
        backend.bind_model_texture(ModelType::ThreeDo, THREE_DO_ATLAS);
    }

    fn pop_state(&self, backend: &mut dyn UnitRenderBackend) {
        backend.pop_model_state(ModelType::ThreeDo);
    }

    fn bind_texture(&self, _backend: &mut dyn UnitRenderBackend, _texture_type: u32) {
        // atlas is bound in push_state
    }
}

/// Renderer for per-model textured formats (S3O, Assimp)
#[derive(Debug)]
pub struct TexturedRenderer {
    model_type: ModelType,
}

impl ModelTypeRenderer for TexturedRenderer {
    fn model_type(&self) -> ModelType {
        self.model_type
    }

    fn push_state(&self, backend: &mut dyn UnitRenderBackend) {
        backend.push_model_state(self.model_type, true);
    }

    fn pop_state(&self, backend: &mut dyn UnitRenderBackend) {
        backend.pop_model_state(self.model_type);
    }

    fn bind_texture(&self, backend: &mut dyn UnitRenderBackend, texture_type: u32) {
        backend.bind_model_texture(self.model_type, texture_type);
    }
}

static THREE_DO: ThreeDoRenderer = ThreeDoRenderer;
static S3O: TexturedRenderer = TexturedRenderer { model_type: ModelType::S3o };
static ASSIMP: TexturedRenderer = TexturedRenderer { model_type: ModelType::Assimp };

/// Renderer responsible for `model_type`
pub fn renderer_for(model_type: ModelType) -> &'static dyn ModelTypeRenderer {
    match model_type {
        ModelType::ThreeDo => &THREE_DO,
        ModelType::S3o => &S3O,
        ModelType::Assimp => &ASSIMP,
    }
}
