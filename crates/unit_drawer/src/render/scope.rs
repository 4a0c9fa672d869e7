//! Scoped GPU state
//!
//! Every state push the drawer performs is owned by one of these guards. The
//! guard pushes on construction and pops in `Drop`, so state stays balanced on
//! every exit path, early returns and unwinding included. Guards nest by
//! reborrowing the backend through the outer guard:
//!
//! ```ignore
//! let mut pass = PassScope::new(backend, PassKind::Opaque, false);
//! let mut model = ModelStateScope::new(&mut *pass, ModelType::S3o);
//! model.draw_model(&draw);
//! ```

use std::ops::{Deref, DerefMut};

use crate::scene::ModelType;
use super::backend::{PassKind, UnitRenderBackend};
use super::drawer_state::UnitDrawerState;
use super::model_renderer::{renderer_for, ModelTypeRenderer};

/// Global pass state held for the lifetime of the guard
pub struct PassScope<'a> {
    backend: &'a mut dyn UnitRenderBackend,
    pass: PassKind,
    deferred: bool,
}

impl<'a> PassScope<'a> {
    /// Push pass state
    pub fn new(backend: &'a mut dyn UnitRenderBackend, pass: PassKind, deferred: bool) -> Self {
        log::trace!("Enter {:?} pass (deferred: {})", pass, deferred);
        backend.push_pass_state(pass, deferred);
        Self { backend, pass, deferred }
    }

    /// Pass this guard holds state for
    pub fn pass(&self) -> PassKind {
        self.pass
    }

    /// True if drawing into the geometry buffer
    pub fn deferred(&self) -> bool {
        self.deferred
    }
}

impl Drop for PassScope<'_> {
    fn drop(&mut self) {
        self.backend.pop_pass_state(self.pass, self.deferred);
        log::trace!("Leave {:?} pass", self.pass);
    }
}

impl<'a> Deref for PassScope<'a> {
    type Target = dyn UnitRenderBackend + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.backend
    }
}

impl DerefMut for PassScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.backend
    }
}

/// Enabled drawer state (shader) held for the lifetime of the guard
pub struct DrawerStateScope<'a> {
    backend: &'a mut dyn UnitRenderBackend,
    state: &'a dyn UnitDrawerState,
    deferred: bool,
}

impl<'a> DrawerStateScope<'a> {
    /// Enable `state`
    pub fn new(
        backend: &'a mut dyn UnitRenderBackend,
        state: &'a dyn UnitDrawerState,
        deferred: bool,
        alpha_pass: bool,
    ) -> Self {
        state.enable(backend, deferred, alpha_pass);
        Self { backend, state, deferred }
    }

    /// The enabled state
    pub fn state(&self) -> &'a dyn UnitDrawerState {
        self.state
    }
}

impl Drop for DrawerStateScope<'_> {
    fn drop(&mut self) {
        self.state.disable(&mut *self.backend, self.deferred);
    }
}

impl<'a> Deref for DrawerStateScope<'a> {
    type Target = dyn UnitRenderBackend + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.backend
    }
}

impl DerefMut for DrawerStateScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.backend
    }
}

/// Model-type state held for the lifetime of the guard
pub struct ModelStateScope<'a> {
    backend: &'a mut dyn UnitRenderBackend,
    renderer: &'static dyn ModelTypeRenderer,
}

impl<'a> ModelStateScope<'a> {
    /// Push state for `model_type`
    pub fn new(backend: &'a mut dyn UnitRenderBackend, model_type: ModelType) -> Self {
        let renderer = renderer_for(model_type);
        renderer.push_state(backend);
        Self { backend, renderer }
    }

    /// Renderer for the scoped model type
    pub fn renderer(&self) -> &'static dyn ModelTypeRenderer {
        self.renderer
    }

    /// Bind a texture set through the model type's renderer
    pub fn bind_texture(&mut self, texture_type: u32) {
        self.renderer.bind_texture(&mut *self.backend, texture_type);
    }
}

impl Drop for ModelStateScope<'_> {
    fn drop(&mut self) {
        self.renderer.pop_state(&mut *self.backend);
    }
}

impl<'a> Deref for ModelStateScope<'a> {
    type Target = dyn UnitRenderBackend + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.backend
    }
}

impl DerefMut for ModelStateScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.backend
    }
}
