use std::path::Path;

use tracing::debug;

use crate::buffer::PixelBuffer;
use crate::error::Result;

/// Resolution the stored body image was drawn for.
pub const DEFAULT_BODY_NATIVE_RESOLUTION: u32 = 1600;

/// Pre-rendered body image, loaded once and shared read-only.
///
/// Recoloured variants are produced per request with
/// [`shift_hue`](crate::color::shift_hue); the asset itself never changes.
#[derive(Debug, Clone, PartialEq)]
///
/// The resolution it was drawn for lives in
/// [`CompositeConfig`](crate::composite::CompositeConfig).
pub struct BodyAsset {
    image: PixelBuffer,
}

impl BodyAsset {
    /// Wrap an already decoded body image.
    pub fn new(image: PixelBuffer) -> Self {
        Self { image }
    }

    /// Load a body image from disk (PNG or TGA).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)?.to_rgba8();
        debug!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "loaded body image"
        );
        Ok(Self::new(PixelBuffer::from(image)))
    }

    /// Decode a body image held in memory.
    pub fn from_encoded(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        Ok(Self::new(PixelBuffer::from(image)))
    }

    /// Body pixels as drawn, before any recolouring.
    pub fn image(&self) -> &PixelBuffer {
        &self.image
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::ImageFormat;

    use super::*;
    use crate::error::ImageError;

    #[test]
    fn decodes_png_body() {
        let source = PixelBuffer::from_pixel(3, 5, [115, 40, 173, 255]);
        let mut png = Vec::new();
        source
            .to_rgba_image()
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let asset = BodyAsset::from_encoded(&png).unwrap();
        assert_eq!(asset.image(), &source);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            BodyAsset::from_encoded(b"not an image"),
            Err(ImageError::Decode(_))
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(BodyAsset::load("/nonexistent/miibridge/body.png").is_err());
    }
}
