use std::path::Path;

use crate::error::LoadError;

/// Decoded RGBA8 pixels, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureImage {
    pub fn load(path: &Path) -> Result<TextureImage, LoadError> {
        if !path.exists() {
            return Err(LoadError::FileNotFound(path.to_path_buf()));
        }
        let image = image::open(path)
            .map_err(|source| LoadError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        log::info!(
            "Loaded texture {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(TextureImage {
            width: image.width(),
            height: image.height(),
            pixels: image.into_raw(),
        })
    }

    /// A single white pixel, so untextured models are lit with their own
    /// shading.
    pub fn white() -> TextureImage {
        TextureImage {
            width: 1,
            height: 1,
            pixels: vec![0xFF; 4],
        }
    }
}
