use std::{path::Path, rc::Rc};

use crate::{
    data_structures::texture::Texture,
    error::{LoadError, LoadStage, Result},
    resources::{AssetLoader, ProgressCallback},
};

/// Image format hint taken from the file extension of `url`.
pub fn format_of(url: &str) -> Option<&str> {
    Path::new(url).extension().and_then(|extension| extension.to_str())
}

/// Image format hint taken from a mime type such as `image/png`.
pub fn format_of_mime(mime_type: &str) -> Option<&str> {
    mime_type.split('/').next_back()
}

impl AssetLoader {
    /// Fetch and decode the texture at `url`.
    pub(crate) async fn load_texture(
        &self,
        url: &str,
        is_normal_map: bool,
        progress: ProgressCallback<'_>,
    ) -> Result<Rc<Texture>> {
        let data = self.fetch(url, LoadStage::Texture, progress).await?;
        decode_texture(&data, url, format_of(url), is_normal_map)
    }
}

/// Decode texture bytes, attributing failures to the texture stage.
pub(crate) fn decode_texture(
    data: &[u8],
    label: &str,
    format: Option<&str>,
    is_normal_map: bool,
) -> Result<Rc<Texture>> {
    Texture::from_bytes(data, label, format, is_normal_map)
        .map(Rc::new)
        .map_err(|e| LoadError::stage(LoadStage::Texture, label, e))
}
