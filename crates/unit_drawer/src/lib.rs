//! # Unit Drawer
//!
//! Per-frame unit rendering for an RTS engine: decides for every unit whether
//! it is drawn as a model, an icon, a ghost or not at all, and submits the
//! resulting draws pass by pass through a backend trait.
//!
//! ## Features
//!
//! - **Model/icon LOD**: distance-based switch with radar blips and always-icon units
//! - **Pass orchestration**: opaque (forward/deferred), alpha, shadow and icon passes
//! - **Ghosted buildings**: per-ally-team snapshots with explicit reference counts
//! - **Temporary previews**: tick-based preview models for placement and build queues
//! - **Scoped GPU state**: every push is popped by a guard, panics included
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use unit_drawer::prelude::*;
//!
//! let mut drawer = UnitDrawer::new(DrawerConfig::default());
//! let mut units: HashMap<UnitId, Unit> = HashMap::new();
//! let model = ModelRef::new(ModelId(1), ModelType::S3o, 0, 16.0, 24.0);
//! units.insert(UnitId(1), Unit::new(UnitId(1), Vec3::zeros(), Some(model)));
//!
//! drawer.handle_event(RenderEvent::UnitCreated { unit: UnitId(1), cloaked: false }, &units);
//!
//! let camera = Camera::default();
//! let ground = FlatGround(0.0);
//! let ctx = FrameContext::new(1, &camera, &units, &ground);
//! drawer.update(&ctx);
//!
//! let mut backend = RecordingBackend::new();
//! drawer.draw(&mut backend, &ctx);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod scene;
pub mod render;

/// Common imports for drawer users
pub mod prelude {
    pub use crate::{
        config::{AlphaValues, Config, ConfigError, DrawerConfig},
        foundation::math::{Mat4, Vec3},
        render::{
            units::{DrawHooks, DrawSlot, FrameContext, TempDrawUnit, ViewMode},
            DrawerStateKind, PassKind, RecordingBackend, UnitDrawer, UnitRenderBackend,
        },
        scene::{
            AllyTeamId, Camera, EventSink, FlatGround, GroundQuery, IconData, IconId, LosQuery,
            ModelId, ModelRef, ModelType, RenderEvent, TeamId, Unit, UnitId, UnitSource,
        },
    };
}
