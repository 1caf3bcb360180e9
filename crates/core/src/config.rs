//! Viewer configuration.
//!
//! Defaults reproduce the stock page: a 60° camera three units back, a white
//! ambient + directional light pair, and the strata model blown up 50×.
//! A host page may embed a partial JSON override; every missing field keeps
//! its default.

use serde::{Deserialize, Serialize};

/// Error type for configuration parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid viewer config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid log level: {0}")]
    LogLevel(String),
}

/// Perspective camera settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            near: 0.01,
            far: 1000.0,
            position: [0.0, 0.0, 3.0],
        }
    }
}

/// Light rig settings. Colors are 0xRRGGBB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient_color: u32,
    pub ambient_intensity: f32,
    pub directional_color: u32,
    pub directional_intensity: f32,
    /// Light position; it shines toward the origin.
    pub directional_position: [f32; 3],
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_color: 0xffffff,
            ambient_intensity: 0.6,
            directional_color: 0xffffff,
            directional_intensity: 1.0,
            directional_position: [1.0, 3.0, 2.0],
        }
    }
}

/// Where the loaded model is placed in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPlacement {
    pub scale: [f32; 3],
    pub position: [f32; 3],
}

impl Default for ModelPlacement {
    fn default() -> Self {
        Self {
            scale: [50.0, 50.0, 50.0],
            position: [0.0, -1.0, 0.0],
        }
    }
}

/// DOM element ids and classes the viewer binds to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementIds {
    pub canvas: String,
    pub video: String,
    pub consent_modal: String,
    pub consent_button: String,
    pub hidden_class: String,
}

impl Default for ElementIds {
    fn default() -> Self {
        Self {
            canvas: "canvas".into(),
            video: "camera".into(),
            consent_modal: "device-orien-modal".into(),
            consent_button: "device-orien-modal-button".into(),
            hidden_class: "is-hidden".into(),
        }
    }
}

/// Complete viewer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Model path, relative to the page.
    pub asset_path: String,
    /// Y rotation added to the model every frame, in radians.
    pub spin_per_frame: f32,
    /// Max log level: trace, debug, info, warn or error.
    pub log_level: String,
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
    pub model: ModelPlacement,
    pub elements: ElementIds,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            asset_path: "./assets/tinker2.glb".into(),
            spin_per_frame: 0.002,
            log_level: "info".into(),
            camera: CameraConfig::default(),
            lighting: LightingConfig::default(),
            model: ModelPlacement::default(),
            elements: ElementIds::default(),
        }
    }
}

impl ViewerConfig {
    /// Parse a (possibly partial) JSON override.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.max_log_level()?;
        Ok(config)
    }

    /// Resolve `log_level` into a `tracing` level.
    pub fn max_log_level(&self) -> Result<tracing::Level, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::LogLevel(self.log_level.clone()))
    }
}

/// Split 0xRRGGBB into linear-ish [r, g, b] in 0..=1.
pub fn rgb_from_hex(color: u32) -> [f32; 3] {
    [
        ((color >> 16) & 0xff) as f32 / 255.0,
        ((color >> 8) & 0xff) as f32 / 255.0,
        (color & 0xff) as f32 / 255.0,
    ]
}
