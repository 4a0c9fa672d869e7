//! Configuration system
//!
//! The drawer's tunables are a handful of run-time adjustable scalars.
//! Persistence belongs to external settings storage; [`Config`] only gives
//! that storage a TOML/RON round trip.

pub use serde::{Serialize, Deserialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        Self::from_str_with_format(&contents, path)
    }

    /// Parse configuration text, picking the format from `path`'s extension
    fn from_str_with_format(contents: &str, path: &str) -> Result<Self, ConfigError> {
        if path.ends_with(".toml") {
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Smallest draw distance the drawer accepts (world units)
pub const MIN_DRAW_DIST: f32 = 1.0;

/// Smallest icon distance the drawer accepts
pub const MIN_ICON_DIST: f32 = 0.0;

/// Per-category alpha values used when drawing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaValues {
    /// Regular (cloaked) unit alpha
    pub regular: f32,
    /// Ghost alpha when the ghosted unit is out of radar
    pub ghost_out_of_radar: f32,
    /// Ghost alpha when the ghosted unit is inside radar
    pub ghost_in_radar: f32,
    /// Alpha of temporary (preview) draw units
    pub temp_unit: f32,
}

impl Default for AlphaValues {
    fn default() -> Self {
        Self {
            regular: 0.4,
            ghost_out_of_radar: 0.2,
            ghost_in_radar: 0.6,
            temp_unit: 0.4,
        }
    }
}

impl AlphaValues {
    fn clamped(self) -> Self {
        Self {
            regular: clamp_unit(self.regular, "regular"),
            ghost_out_of_radar: clamp_unit(self.ghost_out_of_radar, "ghost_out_of_radar"),
            ghost_in_radar: clamp_unit(self.ghost_in_radar, "ghost_in_radar"),
            temp_unit: clamp_unit(self.temp_unit, "temp_unit"),
        }
    }
}

/// Unit drawer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawerConfig {
    /// Maximum camera distance at which full models are drawn
    pub unit_draw_dist: f32,
    /// Distance scale controlling the model/icon switch
    pub unit_icon_dist: f32,
    /// Measure icon distance from the camera to the ground instead of to the unit
    pub use_dist_to_ground_for_icons: bool,
    /// Alpha values per draw category
    pub alpha_values: AlphaValues,
    /// Frames a dead ghost survives after its unit died (0 keeps it until seen)
    pub dead_ghost_lifetime: u32,
    /// Draw the forward opaque pass
    pub draw_forward: bool,
    /// Draw the deferred opaque pass (needs a geometry buffer)
    pub draw_deferred: bool,
    /// Run the shadow pass
    pub shadows_enabled: bool,
    /// Skip the alpha pass when nothing transparent is queued
    pub skip_empty_alpha_pass: bool,
    /// Rasterize models as wireframe
    pub wire_frame_mode: bool,
}

impl Default for DrawerConfig {
    fn default() -> Self {
        Self {
            unit_draw_dist: 2000.0,
            unit_icon_dist: 200.0,
            use_dist_to_ground_for_icons: false,
            alpha_values: AlphaValues::default(),
            dead_ghost_lifetime: 30 * 60 * 10,
            draw_forward: true,
            draw_deferred: false,
            shadows_enabled: true,
            skip_empty_alpha_pass: true,
            wire_frame_mode: false,
        }
    }
}

impl Config for DrawerConfig {}

impl DrawerConfig {
    /// Copy of this configuration with every scalar clamped to its valid range
    pub fn sanitized(&self) -> Self {
        Self {
            unit_draw_dist: clamp_distance(self.unit_draw_dist, MIN_DRAW_DIST, "unit_draw_dist"),
            unit_icon_dist: clamp_distance(self.unit_icon_dist, MIN_ICON_DIST, "unit_icon_dist"),
            alpha_values: self.alpha_values.clamped(),
            ..self.clone()
        }
    }
}

/// Clamp a distance setting to `min`, treating non-finite input as `min`
pub fn clamp_distance(value: f32, min: f32, name: &str) -> f32 {
    if !value.is_finite() || value < min {
        log::warn!("{} = {} out of range, clamped to {}", name, value, min);
        return min;
    }
    value
}

fn clamp_unit(value: f32, name: &str) -> f32 {
    if value.is_nan() {
        log::warn!("alpha value {} is NaN, clamped to 1.0", name);
        return 1.0;
    }
    let clamped = value.clamp(0.0, 1.0);
    if clamped != value {
        log::warn!("alpha value {} = {} out of range, clamped to {}", name, value, clamped);
    }
    clamped
}
