//! Image codec adapter.
//!
//! Decodes an image file, shrinks it so neither dimension exceeds a
//! configurable maximum, normalizes the color mode to RGB and re-encodes it
//! as an in-memory JPEG ready for transport to a model endpoint.

use anyhow::{Context, Result};
use base64::Engine as _;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

/// Largest edge sent to a model endpoint unless configured otherwise.
pub const DEFAULT_MAX_DIMENSION: u32 = 1024;

/// A JPEG re-encoding of a source image, held in memory.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    jpeg: Vec<u8>,
}

impl EncodedImage {
    pub fn jpeg_bytes(&self) -> &[u8] {
        &self.jpeg
    }

    /// Base64 of the JPEG bytes.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.jpeg)
    }

    /// Data URL form used inside chat-completion image payloads.
    pub fn to_data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.to_base64())
    }
}

/// Prepare the image at `path` for transmission to a model endpoint.
///
/// Missing files and decode failures are logged and reported as `None`;
/// callers must treat `None` as "skip this item", never as fatal.
pub fn encode_for_transport(path: &Path, max_dimension: u32) -> Option<EncodedImage> {
    match try_encode(path, max_dimension) {
        Ok(encoded) => Some(encoded),
        Err(err) => {
            tracing::error!("Failed to prepare image {}: {:#}", path.display(), err);
            None
        }
    }
}

fn try_encode(path: &Path, max_dimension: u32) -> Result<EncodedImage> {
    let img =
        image::open(path).with_context(|| format!("failed to decode {}", path.display()))?;

    // Aspect-preserving shrink only; small images pass through untouched.
    let img = if img.width() > max_dimension || img.height() > max_dimension {
        img.thumbnail(max_dimension, max_dimension)
    } else {
        img
    };

    // JPEG has no alpha channel, so normalize RGBA and friends to RGB.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buf = Cursor::new(Vec::new());
    rgb.write_to(&mut buf, ImageFormat::Jpeg)
        .context("failed to re-encode as JPEG")?;
    Ok(EncodedImage {
        jpeg: buf.into_inner(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_png(dir: &TempDir, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([120, 180, 90, 255]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn missing_file_returns_none() {
        let result = encode_for_transport(Path::new("/nonexistent/photo.jpg"), 1024);
        assert!(result.is_none());
    }

    #[test]
    fn garbage_bytes_return_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("not-an-image.png");
        std::fs::write(&path, b"definitely not a PNG").unwrap();
        assert!(encode_for_transport(&path, 1024).is_none());
    }

    #[test]
    fn encodes_valid_image_as_jpeg() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "small.png", 64, 48);

        let encoded = encode_for_transport(&path, 1024).unwrap();
        let decoded = image::load_from_memory(encoded.jpeg_bytes()).unwrap();
        assert_eq!(decoded.width(), 64);
        assert_eq!(decoded.height(), 48);
    }

    #[test]
    fn oversized_image_is_shrunk_preserving_aspect() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "wide.png", 2048, 1024);

        let encoded = encode_for_transport(&path, 1024).unwrap();
        let decoded = image::load_from_memory(encoded.jpeg_bytes()).unwrap();
        assert_eq!(decoded.width(), 1024);
        assert_eq!(decoded.height(), 512);
    }

    #[test]
    fn small_image_is_not_upscaled() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "tiny.png", 10, 10);

        let encoded = encode_for_transport(&path, 1024).unwrap();
        let decoded = image::load_from_memory(encoded.jpeg_bytes()).unwrap();
        assert_eq!(decoded.width(), 10);
        assert_eq!(decoded.height(), 10);
    }

    #[test]
    fn data_url_has_jpeg_prefix() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "img.png", 16, 16);

        let encoded = encode_for_transport(&path, 1024).unwrap();
        assert!(encoded.to_data_url().starts_with("data:image/jpeg;base64,"));
    }
}
