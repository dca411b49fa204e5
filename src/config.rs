//! Scene configuration loaded from `config.json` at startup.
//!
//! Keys are upper case in the file, for example:
//!
//! ```json
//! {
//!   "WINDOW": { "NAME": "orrery", "WIDTH": 1280, "HEIGHT": 720 },
//!   "EYE": { "THETA": 0.0, "PHI": 0.3, "R": 10.0, "FOV": 45.0 },
//!   "OBJECTS": [{ "NAME": "sun", "MODEL": "sphere.obj", "SHADER": "basic" }],
//!   "LIGHTS": [{ "TYPE": "point", "POSITION": [0, 5, 0] }]
//! }
//! ```
use glam::Vec3;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::platform::AssetSource;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source:#}")]
    Read {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top level configuration document.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    #[serde(default)]
    pub window: WindowConfig,
    pub eye: EyeConfig,
    #[serde(default)]
    pub objects: Vec<ObjectConfig>,
    #[serde(default)]
    pub lights: Vec<LightConfig>,
}

impl Config {
    /// Name of the configuration file in the content directory.
    pub const FILE_NAME: &'static str = "config.json";

    /// Parse a configuration document from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse the configuration file at `path`.
    pub fn load(assets: &dyn AssetSource, path: &str) -> Result<Self, ConfigError> {
        info!("loading configuration from {path}");

        let json = assets
            .load_as_string(path)
            .map_err(|source| ConfigError::Read {
                path: path.to_owned(),
                source,
            })?;

        Self::from_json(&json)
    }
}

/// Main window settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct WindowConfig {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl WindowConfig {
    /// A zero width and height requests a borderless fullscreen window at the
    /// display's native resolution.
    pub fn is_fullscreen(&self) -> bool {
        self.width == 0 && self.height == 0
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            name: "orrery".to_owned(),
            width: 1280,
            height: 720,
        }
    }
}

/// Initial orbital camera placement. Angles `THETA` and `PHI` are radians,
/// `FOV` is the vertical field of view in degrees.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct EyeConfig {
    #[serde(default)]
    pub theta: f32,
    #[serde(default)]
    pub phi: f32,
    pub r: f32,
    #[serde(default)]
    pub look_at: Vec3,
    #[serde(default = "EyeConfig::default_fov")]
    pub fov: f32,
    #[serde(default = "EyeConfig::default_near_plane")]
    pub near_plane: f32,
    #[serde(default = "EyeConfig::default_far_plane")]
    pub far_plane: f32,
}

impl EyeConfig {
    fn default_fov() -> f32 {
        45.0
    }

    fn default_near_plane() -> f32 {
        0.01
    }

    fn default_far_plane() -> f32 {
        100.0
    }
}

/// Scale is either a single uniform factor or a per-axis vector.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scale {
    Uniform(f32),
    PerAxis(Vec3),
}

impl Scale {
    pub fn to_vec3(self) -> Vec3 {
        match self {
            Scale::Uniform(s) => Vec3::splat(s),
            Scale::PerAxis(v) => v,
        }
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::Uniform(1.0)
    }
}

/// A scene object and the objects attached beneath it. `ROTATION` holds Euler
/// angles in degrees.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ObjectConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub model: String,
    pub shader: String,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default)]
    pub scale: Scale,
    #[serde(default)]
    pub dependants: Vec<ObjectConfig>,
}

impl ObjectConfig {
    /// The model file name, or `None` for objects that only group children.
    pub fn model_name(&self) -> Option<&str> {
        match self.model.trim() {
            "" => None,
            name => Some(name),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    Point,
    Directional,
}

/// A light source entry. Fields that do not apply to the light's `TYPE` are
/// ignored. Cone angles are degrees.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LightConfig {
    #[serde(rename = "TYPE")]
    pub kind: String,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default = "LightConfig::default_color")]
    pub color: Vec3,
    #[serde(default = "LightConfig::default_strength")]
    pub strength: f32,
    #[serde(default = "LightConfig::default_direction")]
    pub direction: Vec3,
    #[serde(default = "LightConfig::default_inner_angle")]
    pub inner_angle: f32,
    #[serde(default = "LightConfig::default_outer_angle")]
    pub outer_angle: f32,
}

impl LightConfig {
    /// Get the kind of light named by `TYPE`, or `None` if the type is not
    /// recognized.
    pub fn light_kind(&self) -> Option<LightKind> {
        match self.kind.to_ascii_lowercase().as_str() {
            "point" => Some(LightKind::Point),
            "directional" | "spot" => Some(LightKind::Directional),
            _ => None,
        }
    }

    fn default_color() -> Vec3 {
        Vec3::ONE
    }

    fn default_strength() -> f32 {
        1.0
    }

    fn default_direction() -> Vec3 {
        Vec3::NEG_Y
    }

    fn default_inner_angle() -> f32 {
        12.5
    }

    fn default_outer_angle() -> f32 {
        17.5
    }
}
