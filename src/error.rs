//! Error types for asset loading and configuration.
//!
//! Collaborators (asset sources, decoders) report failures as
//! [`anyhow::Error`]. The pipeline maps them into [`LoadError`] at every stage
//! boundary so that callers learn which stage failed and why, and can decide
//! between retrying and giving up.

use std::fmt;

use thiserror::Error;

/// The stage of the asset pipeline a failure belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadStage {
    /// Fetching or parsing an `.obj` geometry file.
    Geometry,
    /// Fetching or parsing an `.mtl` material-definition file.
    MaterialFile,
    /// Fetching or decoding a texture image.
    Texture,
    /// Fetching or parsing a glTF scene document.
    SceneDocument,
    /// Fetching or decoding a glTF binary buffer.
    Buffer,
    /// Fetching or decoding the shared environment texture.
    Environment,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadStage::Geometry => "geometry",
            LoadStage::MaterialFile => "material file",
            LoadStage::Texture => "texture",
            LoadStage::SceneDocument => "scene document",
            LoadStage::Buffer => "buffer",
            LoadStage::Environment => "environment map",
        };
        f.write_str(name)
    }
}

/// A failed [`load_asset`](crate::resources::AssetLoader::load_asset) call.
///
/// `LoadError` is `Clone` so that a single failed environment fetch can be
/// observed by every pipeline that shares it.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum LoadError {
    /// The file extension is neither `obj` nor `gltf`/`glb`.
    #[error("unsupported model format `{extension}` for {filename}")]
    UnsupportedFormat { filename: String, extension: String },

    /// A stage of the pipeline failed.
    #[error("{stage} stage failed for {url}: {cause}")]
    Stage {
        stage: LoadStage,
        url: String,
        cause: String,
    },
}

impl LoadError {
    pub fn stage(stage: LoadStage, url: &str, cause: anyhow::Error) -> Self {
        Self::Stage {
            stage,
            url: url.to_string(),
            // `{:#}` keeps the whole context chain on one line
            cause: format!("{cause:#}"),
        }
    }

    /// The failing stage, if the error came from one.
    pub fn failed_stage(&self) -> Option<LoadStage> {
        match self {
            LoadError::UnsupportedFormat { .. } => None,
            LoadError::Stage { stage, .. } => Some(*stage),
        }
    }
}

/// Errors produced while reading a [`Config`](crate::config::Config).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, LoadError>;
