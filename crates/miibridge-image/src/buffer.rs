use image::RgbaImage;

use crate::error::{ImageError, Result};

fn plane_len(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// RGBA8 pixels, row-major, top-left origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; plane_len(width, height) * 4],
        }
    }

    /// Buffer filled with one colour.
    pub fn from_pixel(width: u32, height: u32, pixel: [u8; 4]) -> Self {
        let data = pixel.repeat(plane_len(width, height));
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap raw RGBA bytes; the length must be `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = plane_len(width, height) * 4;
        if data.len() != expected {
            return Err(ImageError::BufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Row-major RGBA bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer and return its RGBA bytes.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Pixel at linear index `i` (row-major).
    pub fn pixel_at(&self, i: usize) -> [u8; 4] {
        let p = &self.data[i * 4..i * 4 + 4];
        [p[0], p[1], p[2], p[3]]
    }

    /// Pixel at column `x`, row `y`. Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixel_at(y as usize * self.width as usize + x as usize)
    }

    /// Overwrite the pixel at linear index `i`.
    pub fn set_pixel_at(&mut self, i: usize, pixel: [u8; 4]) {
        self.data[i * 4..i * 4 + 4].copy_from_slice(&pixel);
    }

    /// Every pixel in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.data.chunks_exact(4).map(|p| [p[0], p[1], p[2], p[3]])
    }

    /// Swap the red and blue channels (BGRA <-> RGBA).
    pub fn swap_red_blue(&mut self) {
        for pixel in self.data.chunks_exact_mut(4) {
            pixel.swap(0, 2);
        }
    }

    /// Reverse row order (bottom-left origin <-> top-left).
    pub fn flip_vertical(&mut self) {
        let stride = self.width as usize * 4;
        if stride == 0 {
            return;
        }
        let rows = self.height as usize;
        for top in 0..rows / 2 {
            let bottom = rows - 1 - top;
            let (upper, lower) = self.data.split_at_mut(bottom * stride);
            upper[top * stride..(top + 1) * stride].swap_with_slice(&mut lower[..stride]);
        }
    }

    /// Copy into an [`RgbaImage`] for encoding or resampling.
    pub fn to_rgba_image(&self) -> RgbaImage {
        // Dimensions and length are kept consistent by every constructor.
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }
}

/// Per-pixel f32 depth, same ordering and dimensions as the paired pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthBuffer {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl DepthBuffer {
    /// Wrap depth samples; the length must be `width * height`.
    pub fn from_raw(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        let expected = plane_len(width, height);
        if data.len() != expected {
            return Err(ImageError::BufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Decode little-endian f32 samples.
    pub fn from_le_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        let expected = plane_len(width, height) * 4;
        if bytes.len() != expected {
            return Err(ImageError::BufferSize {
                width,
                height,
                expected,
                actual: bytes.len(),
            });
        }
        let data = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Row-major depth samples.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Depth at linear index `i`, `None` past the end.
    pub fn get(&self, i: usize) -> Option<f32> {
        self.data.get(i).copied()
    }
}
