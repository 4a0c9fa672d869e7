//! Script hooks
//!
//! Game scripts may take over a unit's transform or its whole draw. The
//! drawer calls these hooks while drawing, so they only see shared state and
//! report changes through an [`crate::scene::EventSink`].

use crate::foundation::math::Mat4;
use crate::render::backend::{PassKind, UnitRenderBackend};
use crate::scene::Unit;

/// Optional per-unit drawing overrides
pub trait DrawHooks {
    /// Model-to-world transform to use instead of the unit's own
    fn override_transform(&self, _unit: &Unit) -> Option<Mat4> {
        None
    }

    /// Draw `unit` in place of the drawer; return true if it was drawn
    fn draw_unit(&self, _unit: &Unit, _pass: PassKind, _backend: &mut dyn UnitRenderBackend) -> bool {
        false
    }
}
