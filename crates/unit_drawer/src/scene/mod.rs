//! Scene-side types consumed by the drawer
//!
//! Units, models, icons and cameras are owned by the simulation and asset
//! systems. The drawer only ever holds ids and small `Copy` descriptors.

pub mod model;
pub mod unit;
pub mod camera;
pub mod events;

pub use model::{ModelType, ModelId, ModelRef, MODEL_TYPE_COUNT};
pub use unit::{
    Unit, UnitId, TeamId, AllyTeamId, DecalId, IconId, IconData,
    UnitSource, GroundQuery, FlatGround, LosQuery, MAX_ALLY_TEAMS,
};
pub use camera::Camera;
pub use events::{RenderEvent, EventSink};
