//! Runtime configuration.
//!
//! All fields carry defaults and the struct uses `#[serde(default)]`, so a
//! TOML file only needs to name the values it overrides:
//!
//! ```toml
//! asset_root = "public/assets"
//! environment_intensity = 0.2
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment map applied to every glTF surface material.
pub const DEFAULT_ENVIRONMENT_URL: &str = "textures/environment.jpg";
/// Low environment intensity so reflections tint rather than dominate.
pub const DEFAULT_ENVIRONMENT_INTENSITY: f32 = 0.1;
/// Duration of a `Linear` color animation.
pub const DEFAULT_LINEAR_DURATION_MILLIS: u64 = 250;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory (native) or URL path (wasm) all asset paths are relative to.
    pub asset_root: PathBuf,
    pub environment_url: String,
    pub environment_intensity: f32,
    pub linear_duration_millis: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            environment_url: DEFAULT_ENVIRONMENT_URL.to_string(),
            environment_intensity: DEFAULT_ENVIRONMENT_INTENSITY,
            linear_duration_millis: DEFAULT_LINEAR_DURATION_MILLIS,
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a config from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
