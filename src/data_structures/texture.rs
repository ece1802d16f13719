//! Decoded textures.
//!
//! A [`Texture`] is the CPU-side image of a diffuse map, normal map or the
//! shared environment map. Textures are shared between materials through
//! `Rc<Texture>`; identity (`Rc::ptr_eq`) is what tells two materials apart
//! that reference "the same" texture.

use anyhow::*;
use image::{DynamicImage, GenericImageView, ImageFormat, load_from_memory, load_from_memory_with_format};

#[derive(Clone, Debug)]
pub struct Texture {
    pub label: String,
    pub image: DynamicImage,
    /// Normal maps hold linear data and must not be treated as sRGB.
    pub is_normal_map: bool,
}

impl Texture {
    /// Decode a texture from encoded bytes.
    ///
    /// `format` is a file extension or mime subtype (`"png"`, `"jpeg"`, ...).
    /// When it is absent or unknown, the image crate guesses from the bytes.
    pub fn from_bytes(
        bytes: &[u8],
        label: &str,
        format: Option<&str>,
        is_normal_map: bool,
    ) -> Result<Self> {
        let image = match format.and_then(ImageFormat::from_extension) {
            Some(format) => load_from_memory_with_format(bytes, format),
            None => load_from_memory(bytes),
        }
        .with_context(|| format!("failed to decode texture {label}"))?;
        Ok(Self {
            label: label.to_string(),
            image,
            is_normal_map,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
