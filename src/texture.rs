//! CPU-side texture images handed to the renderer.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::path::Path;
use thiserror::Error;

/// Largest texture side after power-of-two resizing
pub const MAX_TEXTURE_SIDE: u32 = 1024;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to load texture {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Decoded RGBA8 image with power-of-two dimensions
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureImage {
    /// Decode an image file and resize it to power-of-two dimensions
    pub fn load(path: &Path) -> Result<Self, TextureError> {
        let image = image::open(path)
            .map_err(|source| TextureError::Load {
                path: path.display().to_string(),
                source,
            })?
            .to_rgba8();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::from_rgba(name, image))
    }

    /// Wrap an already decoded image, resizing it to power-of-two dimensions
    pub fn from_rgba(name: impl Into<String>, image: RgbaImage) -> Self {
        let image = resize_to_power_of_two(image);
        Self {
            name: name.into(),
            width: image.width(),
            height: image.height(),
            rgba: image.into_raw(),
        }
    }

    /// Two-colour checkerboard used when no texture file is given
    pub fn checkerboard(size: u32, cells: u32, a: [u8; 4], b: [u8; 4]) -> Self {
        let cell = (size / cells.max(1)).max(1);
        let image = RgbaImage::from_fn(size, size, |x, y| {
            let even = ((x / cell) + (y / cell)) % 2 == 0;
            image::Rgba(if even { a } else { b })
        });
        Self::from_rgba("checkerboard", image)
    }
}

/// Rescale to the next power of two per side (at most [`MAX_TEXTURE_SIDE`]).
///
/// Images that already have power-of-two sides are returned untouched.
pub fn resize_to_power_of_two(image: RgbaImage) -> RgbaImage {
    let (w, h) = image.dimensions();
    if w.is_power_of_two() && h.is_power_of_two() {
        return image;
    }
    let target_w = w.max(1).next_power_of_two().min(MAX_TEXTURE_SIDE);
    let target_h = h.max(1).next_power_of_two().min(MAX_TEXTURE_SIDE);
    imageops::resize(&image, target_w, target_h, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_rounds_up_to_power_of_two() {
        let resized = resize_to_power_of_two(RgbaImage::new(100, 33));
        assert_eq!(resized.dimensions(), (128, 64));
    }

    #[test]
    fn test_resize_clamps_large_images() {
        let resized = resize_to_power_of_two(RgbaImage::new(1500, 20));
        assert_eq!(resized.dimensions(), (1024, 32));
    }

    #[test]
    fn test_power_of_two_untouched() {
        let resized = resize_to_power_of_two(RgbaImage::new(256, 2048));
        assert_eq!(resized.dimensions(), (256, 2048));
    }

    #[test]
    fn test_checkerboard() {
        let white = [255, 255, 255, 255];
        let grey = [80, 80, 80, 255];
        let tex = TextureImage::checkerboard(64, 8, white, grey);

        assert_eq!((tex.width, tex.height), (64, 64));
        assert_eq!(tex.rgba.len(), 64 * 64 * 4);
        assert_eq!(&tex.rgba[0..4], &white);
        // Pixel (8, 0) is in the second cell
        assert_eq!(&tex.rgba[8 * 4..8 * 4 + 4], &grey);
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = TextureImage::load(Path::new("/nonexistent/crate.jpg")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/crate.jpg"));
    }
}
