//! Configurable products.

use std::rc::Rc;

use crate::{
    animation::registry::ActiveEvents, data_structures::material::MaterialRef,
    resources::LoadedAssetResult,
};

/// A product the user configures, together with its loaded models and the
/// animations currently running on it.
#[derive(Debug, Default)]
pub struct ProductItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub assets: Vec<LoadedAssetResult>,
    pub active_events: ActiveEvents,
}

impl ProductItem {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn add_asset(&mut self, asset: LoadedAssetResult) {
        self.assets.push(asset);
    }

    /// Every material of every loaded asset, each shared instance once.
    pub fn materials(&self) -> Vec<MaterialRef> {
        let mut materials: Vec<MaterialRef> = Vec::new();
        for asset in &self.assets {
            for material in asset.scene.materials() {
                if !materials.iter().any(|known| Rc::ptr_eq(known, &material)) {
                    materials.push(material);
                }
            }
        }
        materials
    }
}
