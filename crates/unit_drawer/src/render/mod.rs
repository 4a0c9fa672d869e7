//! Rendering
//!
//! GPU-state abstraction, pass scaffolding and the unit drawer built on it.

pub mod backend;
pub mod recording;
pub mod scope;
pub mod model_renderer;
pub mod drawer_state;
pub mod container;
pub mod units;

pub use backend::{
    UnitRenderBackend, PassKind, DrawMode, DrawSource, ModelDraw, IconVertex,
    GeometryBufferHandle,
};
pub use recording::{RecordingBackend, BackendCall};
pub use scope::{PassScope, DrawerStateScope, ModelStateScope};
pub use drawer_state::{DrawerStateKind, DrawerStateSelector, UnitDrawerState};
pub use container::ModelRenderContainer;
pub use units::UnitDrawer;
