//! Asset loading.
//!
//! [`AssetLoader::load_asset`] turns a [`ModelDescriptor`] into a ready scene
//! subtree: geometry is loaded, materials are resolved, every node casts and
//! receives shadows, glTF materials get the shared environment map, and
//! materials are made double-sided when the descriptor asks for it.
//!
//! Every fetch goes through an [`AssetSource`] and reports its progress, tagged
//! with the pipeline stage it belongs to.

use std::{path::Path, rc::Rc};

use crate::{
    data_structures::scene_graph::SceneNode,
    error::{LoadError, LoadStage, Result},
    resources::{environment::EnvironmentCache, io::AssetSource},
};

pub mod environment;
pub mod gltf;
pub mod io;
pub mod mesh;
pub mod obj;
pub mod texture;

/// Where the materials of a model come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MaterialInfo {
    /// A Wavefront `.mtl` file whose definitions are matched to the model's
    /// surfaces by name.
    FromMaterialFile { path: String, double_sided: bool },
    /// One diffuse and an optional normal texture shared by all surfaces.
    RawTextures {
        diffuse: String,
        normal: Option<String>,
        double_sided: bool,
    },
}

impl MaterialInfo {
    pub fn double_sided(&self) -> bool {
        match self {
            MaterialInfo::FromMaterialFile { double_sided, .. }
            | MaterialInfo::RawTextures { double_sided, .. } => *double_sided,
        }
    }
}

/// A model file and how to resolve its materials.
///
/// glTF files carry their own materials; their `material_info` only decides
/// whether the result is double-sided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub filename: String,
    pub material_info: MaterialInfo,
}

impl ModelDescriptor {
    pub fn new(filename: &str, material_info: MaterialInfo) -> Self {
        Self {
            filename: filename.to_string(),
            material_info,
        }
    }

    /// Lowercase file extension, empty if there is none.
    pub fn extension(&self) -> String {
        Path::new(&self.filename)
            .extension()
            .and_then(|extension| extension.to_str())
            .map(|extension| extension.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

/// A loaded model and the descriptor it was loaded from.
#[derive(Clone, Debug)]
pub struct LoadedAssetResult {
    pub scene: Rc<SceneNode>,
    pub descriptor: ModelDescriptor,
}

/// Progress of one fetch of a running [`AssetLoader::load_asset`].
#[derive(Clone, Debug, PartialEq)]
pub struct LoadProgress {
    pub url: String,
    pub stage: LoadStage,
    pub loaded: u64,
    pub total: Option<u64>,
}

/// Receives [`LoadProgress`] updates.
pub type ProgressCallback<'a> = &'a dyn Fn(&LoadProgress);

/// Loads models from an [`AssetSource`].
///
/// Loaders that share an [`EnvironmentCache`] share the environment texture.
pub struct AssetLoader {
    source: Rc<dyn AssetSource>,
    environment: Rc<EnvironmentCache>,
    environment_url: String,
    environment_intensity: f32,
}

impl AssetLoader {
    pub fn new(
        source: Rc<dyn AssetSource>,
        environment: Rc<EnvironmentCache>,
        environment_url: &str,
        environment_intensity: f32,
    ) -> Self {
        Self {
            source,
            environment,
            environment_url: environment_url.to_string(),
            environment_intensity,
        }
    }

    pub fn environment(&self) -> &Rc<EnvironmentCache> {
        &self.environment
    }

    /// Load the model described by `descriptor`.
    pub async fn load_asset(&self, descriptor: &ModelDescriptor) -> Result<LoadedAssetResult> {
        self.load_asset_with_progress(descriptor, &|_| {}).await
    }

    /// Load the model described by `descriptor`, reporting the progress of
    /// every fetch to `progress`.
    pub async fn load_asset_with_progress(
        &self,
        descriptor: &ModelDescriptor,
        progress: ProgressCallback<'_>,
    ) -> Result<LoadedAssetResult> {
        let extension = descriptor.extension();
        log::debug!("Loading {} as {}", descriptor.filename, extension);
        let scene = match extension.as_str() {
            "obj" => self.load_obj(descriptor, progress).await,
            "gltf" | "glb" => self.load_gltf(descriptor, progress).await,
            _ => Err(LoadError::UnsupportedFormat {
                filename: descriptor.filename.clone(),
                extension,
            }),
        };
        match scene {
            Ok(scene) => {
                log::debug!("Loaded {} ({} nodes)", descriptor.filename, scene.count());
                Ok(LoadedAssetResult {
                    scene: Rc::new(scene),
                    descriptor: descriptor.clone(),
                })
            }
            Err(e) => {
                log::error!("Could not load {}: {}", descriptor.filename, e);
                Err(e)
            }
        }
    }

    /// Fetch `url`, attributing progress and failure to `stage`.
    pub(crate) async fn fetch(
        &self,
        url: &str,
        stage: LoadStage,
        progress: ProgressCallback<'_>,
    ) -> Result<Vec<u8>> {
        log::debug!("Fetching {} ({} stage)", url, stage);
        let report = |loaded: u64, total: Option<u64>| {
            progress(&LoadProgress {
                url: url.to_string(),
                stage,
                loaded,
                total,
            })
        };
        self.source
            .read_bytes(url, &report)
            .await
            .map_err(|e| LoadError::stage(stage, url, e))
    }

    /// Finish a loaded subtree: every node casts and receives shadows, and all
    /// materials are rendered from both sides if requested.
    fn post_process(&self, scene: &mut SceneNode, double_sided: bool) {
        scene.set_shadows(true, true);
        if double_sided {
            scene.set_double_sided();
        }
    }
}
