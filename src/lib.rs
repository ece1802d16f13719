//! flow-configurator
//!
//! Asset loading and material animation core for configurable 3D products,
//! with focus on native and WASM compatibility. Models are loaded into scene
//! graphs whose materials are then recolored frame by frame in response to
//! selection events. Everything runs on one thread, driven by the host's frame
//! loop.
//!
//! High-level modules
//! - `animation`: active event registry, frame-paced animations and material color changes
//! - `config`: runtime configuration loaded from TOML
//! - `context`: owner of the frame loop, caches, loader and selection channel
//! - `data_structures`: products, scene graphs, materials, textures and geometry
//! - `error`: load and configuration errors
//! - `events`: the selection channel
//! - `flow`: frame scheduling and logging setup
//! - `resources`: asset sources and the OBJ / glTF loading pipelines
//!

pub mod animation;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod events;
pub mod flow;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use animation::{
    clear_events, create_animation, AnimationKind, ColorChangeEvent, EventCategory,
    MaterialColorChanger,
};
pub use cgmath;
pub use error::{LoadError, LoadStage};
pub use resources::{AssetLoader, LoadedAssetResult, MaterialInfo, ModelDescriptor};
