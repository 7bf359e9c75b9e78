use std::borrow::Cow;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use tracing::debug;

use crate::body::{BodyAsset, DEFAULT_BODY_NATIVE_RESOLUTION};
use crate::buffer::{DepthBuffer, PixelBuffer};
use crate::color::{shift_hue, Color};
use crate::error::{ImageError, Result};

/// Depth above which a head pixel is treated as empty background.
pub const DEFAULT_DEPTH_THRESHOLD: f32 = 0.986;

/// Compositing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeConfig {
    /// Body pixels only land where head depth is strictly greater than this.
    pub depth_threshold: f32,
    /// Output resolution the body image is drawn at; scaled proportionally.
    pub body_native_resolution: u32,
    /// With no depth buffer, treat head pixels of alpha 0 as background.
    /// Off means a render without depth is returned unchanged.
    pub alpha_fallback: bool,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            depth_threshold: DEFAULT_DEPTH_THRESHOLD,
            body_native_resolution: DEFAULT_BODY_NATIVE_RESOLUTION,
            alpha_fallback: false,
        }
    }
}

/// Merge a body image underneath a head render.
///
/// The body is scaled by `head.width / body_native_resolution`, centred
/// horizontally and placed flush with the bottom edge; anything outside the
/// canvas is clipped. A body pixel is drawn only where the head is
/// background: depth beyond the threshold, or head alpha 0 when no depth
/// buffer is available and [`CompositeConfig::alpha_fallback`] is set.
/// Drawn pixels are opaque. The head buffer is not modified.
pub fn composite(
    head: &PixelBuffer,
    depth: Option<&DepthBuffer>,
    body: &PixelBuffer,
    config: &CompositeConfig,
) -> Result<PixelBuffer> {
    if let Some(depth) = depth {
        if depth.dimensions() != head.dimensions() {
            return Err(ImageError::DimensionMismatch {
                expected: head.dimensions(),
                actual: depth.dimensions(),
            });
        }
    }

    let (canvas_w, canvas_h) = head.dimensions();
    let mut out = head.clone();
    if config.body_native_resolution == 0 {
        return Ok(out);
    }

    let scale = f64::from(canvas_w) / f64::from(config.body_native_resolution);
    let new_w = (f64::from(body.width()) * scale) as u32;
    let new_h = (f64::from(body.height()) * scale) as u32;
    if new_w == 0 || new_h == 0 {
        return Ok(out);
    }
    let scaled = scale_body(body, new_w, new_h);

    let start_x = (i64::from(canvas_w) - i64::from(new_w)) / 2;
    let start_y = i64::from(canvas_h) - i64::from(new_h);
    debug!(new_w, new_h, start_x, start_y, "placing body");

    let mut replaced = 0usize;
    for (bx, by, body_pixel) in scaled.enumerate_pixels() {
        let x = start_x + i64::from(bx);
        let y = start_y + i64::from(by);
        if x < 0 || y < 0 || x >= i64::from(canvas_w) || y >= i64::from(canvas_h) {
            continue;
        }

        let body_pixel = body_pixel.0;
        if body_pixel[3] == 0 {
            continue;
        }

        let index = y as usize * canvas_w as usize + x as usize;
        let head_pixel = head.pixel_at(index);
        let is_background = match depth {
            Some(depth) => depth
                .get(index)
                .is_some_and(|d| d > config.depth_threshold),
            None => config.alpha_fallback && head_pixel[3] == 0,
        };
        if is_background {
            out.set_pixel_at(index, blend(head_pixel, body_pixel));
            replaced += 1;
        }
    }

    debug!(replaced, "body composite done");
    Ok(out)
}

/// Recolour a request-local copy of the body when asked, then composite.
pub fn composite_body(
    head: &PixelBuffer,
    depth: Option<&DepthBuffer>,
    asset: &BodyAsset,
    clothes: Option<Color>,
    config: &CompositeConfig,
) -> Result<PixelBuffer> {
    let body = match clothes {
        Some(target) => Cow::Owned(shift_hue(asset.image(), target)),
        None => Cow::Borrowed(asset.image()),
    };
    composite(head, depth, &body, config)
}

fn scale_body(body: &PixelBuffer, width: u32, height: u32) -> RgbaImage {
    let image = body.to_rgba_image();
    if image.dimensions() == (width, height) {
        return image;
    }
    imageops::resize(&image, width, height, FilterType::Lanczos3)
}

/// `body * a + head * (1 - a)` per colour channel, truncated; alpha 255.
fn blend(head: [u8; 4], body: [u8; 4]) -> [u8; 4] {
    let a = u32::from(body[3]);
    let inv = 255 - a;
    let mut out = [0, 0, 0, 255];
    for c in 0..3 {
        out[c] = ((u32::from(body[c]) * a + u32::from(head[c]) * inv) / 255) as u8;
    }
    out
}
