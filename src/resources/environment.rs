//! Process-wide cache of environment textures.
//!
//! The environment map is the one texture all glTF pipelines share. The first
//! request for a URL starts the fetch and stores the in-flight future; every
//! later request, concurrent or not, awaits that same future and receives the
//! same `Rc<Texture>`.

use std::{cell::RefCell, collections::HashMap, fmt::Debug, rc::Rc};

use futures::future::{FutureExt, LocalBoxFuture, Shared};

use crate::{
    data_structures::texture::Texture,
    error::{LoadError, LoadStage},
    resources::{io::AssetSource, texture::format_of},
};

/// Pending or resolved environment texture.
pub type SharedTexture = Shared<LocalBoxFuture<'static, Result<Rc<Texture>, LoadError>>>;

pub struct EnvironmentCache {
    source: Rc<dyn AssetSource>,
    entries: RefCell<HashMap<String, SharedTexture>>,
}

impl EnvironmentCache {
    pub fn new(source: Rc<dyn AssetSource>) -> Self {
        Self {
            source,
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// The environment texture at `url`.
    ///
    /// Fetches at most once per URL. A failed fetch stays cached, so every
    /// caller observes the same error.
    pub fn load_environment(&self, url: &str) -> SharedTexture {
        self.entries
            .borrow_mut()
            .entry(url.to_string())
            .or_insert_with(|| {
                log::debug!("Fetching environment map {}", url);
                fetch_environment(self.source.clone(), url.to_string())
                    .boxed_local()
                    .shared()
            })
            .clone()
    }

    pub fn is_cached(&self, url: &str) -> bool {
        self.entries.borrow().contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

async fn fetch_environment(
    source: Rc<dyn AssetSource>,
    url: String,
) -> Result<Rc<Texture>, LoadError> {
    let bytes = source
        .read_bytes(&url, &|_, _| {})
        .await
        .map_err(|e| LoadError::stage(LoadStage::Environment, &url, e))?;
    let texture = Texture::from_bytes(&bytes, &url, format_of(&url), false)
        .map_err(|e| LoadError::stage(LoadStage::Environment, &url, e))?;
    Ok(Rc::new(texture))
}

impl Debug for EnvironmentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentCache")
            .field("urls", &self.entries.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}
