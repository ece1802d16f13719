//! Byte sources the asset pipeline fetches from.
//!
//! Natively assets are read from a directory with `tokio::fs`, on the web they
//! are requested over HTTP relative to the page origin. [`MemorySource`] serves
//! embedded or generated assets.

use std::{cell::RefCell, collections::HashMap};

use anyhow::{anyhow, Context as _};
use base64::Engine;
use futures::future::{FutureExt, LocalBoxFuture};

/// Called with `(loaded, total)` bytes while a fetch makes progress. `total`
/// is `None` when the source cannot tell the size up front.
pub type FetchProgress<'a> = &'a dyn Fn(u64, Option<u64>);

/// Anything assets can be read from.
pub trait AssetSource {
    fn read_bytes<'a>(
        &'a self,
        path: &'a str,
        progress: FetchProgress<'a>,
    ) -> LocalBoxFuture<'a, anyhow::Result<Vec<u8>>>;
}

/// Reads assets below a root directory.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Clone, Debug)]
pub struct FileSource {
    root: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileSource {
    const CHUNK_SIZE: usize = 64 * 1024;

    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn read(&self, path: &str, progress: FetchProgress<'_>) -> anyhow::Result<Vec<u8>> {
        use tokio::io::AsyncReadExt;

        let full_path = self.root.join(path);
        let mut file = tokio::fs::File::open(&full_path)
            .await
            .with_context(|| format!("could not open {}", full_path.display()))?;
        let total = file.metadata().await.ok().map(|metadata| metadata.len());
        let mut data = Vec::with_capacity(total.unwrap_or(0) as usize);
        let mut chunk = vec![0; Self::CHUNK_SIZE];
        loop {
            let read = file
                .read(&mut chunk)
                .await
                .with_context(|| format!("could not read {}", full_path.display()))?;
            if read == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..read]);
            progress(data.len() as u64, total);
        }
        Ok(data)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl AssetSource for FileSource {
    fn read_bytes<'a>(
        &'a self,
        path: &'a str,
        progress: FetchProgress<'a>,
    ) -> LocalBoxFuture<'a, anyhow::Result<Vec<u8>>> {
        self.read(path, progress).boxed_local()
    }
}

/// Requests assets relative to the page origin.
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Debug)]
pub struct HttpSource {
    base: reqwest::Url,
}

#[cfg(target_arch = "wasm32")]
impl HttpSource {
    /// Serve assets from `<origin>/<asset_root>/`.
    pub fn from_origin(asset_root: &str) -> anyhow::Result<Self> {
        let window = web_sys::window().ok_or_else(|| anyhow!("no window available"))?;
        let origin = window
            .location()
            .origin()
            .map_err(|_| anyhow!("page origin is not accessible"))?;
        let base = reqwest::Url::parse(&format!("{}/{}/", origin, asset_root.trim_matches('/')))?;
        Ok(Self { base })
    }

    pub fn new(base: reqwest::Url) -> Self {
        Self { base }
    }

    async fn read(&self, path: &str, progress: FetchProgress<'_>) -> anyhow::Result<Vec<u8>> {
        let url = self.base.join(path)?;
        let response = reqwest::get(url.clone())
            .await?
            .error_for_status()
            .with_context(|| format!("could not fetch {url}"))?;
        let total = response.content_length();
        let data = response.bytes().await?.to_vec();
        progress(data.len() as u64, total);
        Ok(data)
    }
}

#[cfg(target_arch = "wasm32")]
impl AssetSource for HttpSource {
    fn read_bytes<'a>(
        &'a self,
        path: &'a str,
        progress: FetchProgress<'a>,
    ) -> LocalBoxFuture<'a, anyhow::Result<Vec<u8>>> {
        self.read(path, progress).boxed_local()
    }
}

/// Serves assets from memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    files: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, data: impl Into<Vec<u8>>) {
        self.files.borrow_mut().insert(path.to_string(), data.into());
    }

    pub fn with_file(self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.borrow().contains_key(path)
    }
}

impl AssetSource for MemorySource {
    fn read_bytes<'a>(
        &'a self,
        path: &'a str,
        progress: FetchProgress<'a>,
    ) -> LocalBoxFuture<'a, anyhow::Result<Vec<u8>>> {
        let result = self
            .files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("{path} not found"));
        if let Ok(data) = &result {
            progress(data.len() as u64, Some(data.len() as u64));
        }
        futures::future::ready(result).boxed_local()
    }
}

/// Decode a `data:` URI. Returns `None` for any other URI.
///
/// Only base64 payloads are supported, which is what glTF exporters write.
pub fn decode_data_uri(uri: &str) -> Option<anyhow::Result<Vec<u8>>> {
    let rest = uri.strip_prefix("data:")?;
    Some(match rest.split_once(',') {
        Some((header, payload)) if header.ends_with(";base64") => {
            base64::engine::general_purpose::STANDARD
                .decode(payload)
                .context("invalid base64 payload in data URI")
        }
        Some(_) => Err(anyhow!("data URI is not base64 encoded")),
        None => Err(anyhow!("malformed data URI")),
    })
}

/// Resolve `relative` against the directory of `base`.
///
/// Files referenced from an asset (material files, textures, buffers) are
/// relative to the asset that references them.
pub fn resolve_relative(base: &str, relative: &str) -> String {
    match base.rfind('/') {
        Some(index) => format!("{}/{}", &base[..index], relative),
        None => relative.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_resolve_relative_paths_against_the_parent_directory() {
        assert_eq!(resolve_relative("models/chair.gltf", "chair.bin"), "models/chair.bin");
        assert_eq!(resolve_relative("chair.obj", "chair.mtl"), "chair.mtl");
    }

    #[test]
    fn should_decode_base64_data_uris() {
        let data = decode_data_uri("data:application/octet-stream;base64,AAEC").unwrap();
        assert_eq!(data.unwrap(), vec![0, 1, 2]);
        assert!(decode_data_uri("chair.bin").is_none());
        assert!(decode_data_uri("data:text/plain,hello").unwrap().is_err());
    }
}
