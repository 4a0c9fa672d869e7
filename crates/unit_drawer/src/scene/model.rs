//! Model Type Definitions
//!
//! Models are bucketed by asset format. Every per-type container in the
//! drawer is a fixed array indexed by [`ModelType::index`], and passes walk
//! the types in [`ModelType::ALL`] order so state changes are batched
//! identically every frame.

/// Number of model formats the drawer buckets by
pub const MODEL_TYPE_COUNT: usize = 3;

/// Coarse category of visual asset format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelType {
    /// Legacy 3DO models, textured from one shared atlas
    ThreeDo,
    /// S3O models with per-model texture pairs
    S3o,
    /// Models imported through Assimp, textured like S3O
    Assimp,
}

impl ModelType {
    /// All model types in draw order
    pub const ALL: [ModelType; MODEL_TYPE_COUNT] = [ModelType::ThreeDo, ModelType::S3o, ModelType::Assimp];

    /// Position of this type in per-type arrays
    pub const fn index(self) -> usize {
        match self {
            ModelType::ThreeDo => 0,
            ModelType::S3o => 1,
            ModelType::Assimp => 2,
        }
    }

    /// Get the human-readable name for this model type
    pub fn name(&self) -> &'static str {
        match self {
            ModelType::ThreeDo => "3DO",
            ModelType::S3o => "S3O",
            ModelType::Assimp => "ASS",
        }
    }

    /// True if all models of this type share one texture binding
    pub fn uses_shared_atlas(&self) -> bool {
        matches!(self, ModelType::ThreeDo)
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Identifier of a model in the asset system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub u32);

/// Non-owning reference to a loaded model
///
/// The asset system owns mesh and texture data; the drawer only needs enough
/// to bucket, bind and cull.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRef {
    /// Asset id
    pub id: ModelId,
    /// Format bucket
    pub model_type: ModelType,
    /// Texture set shared by models drawn with the same bindings
    pub texture_type: u32,
    /// Bounding radius
    pub radius: f32,
    /// Model height, used for build clipping and icon anchors
    pub height: f32,
}

impl ModelRef {
    /// Create a model reference
    pub fn new(id: ModelId, model_type: ModelType, texture_type: u32, radius: f32, height: f32) -> Self {
        Self {
            id,
            model_type,
            texture_type,
            radius,
            height,
        }
    }
}
