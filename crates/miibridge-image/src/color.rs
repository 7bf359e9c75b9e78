use crate::buffer::PixelBuffer;
use crate::error::{ImageError, Result};

/// RGB colour with components normalized to 0..1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Colour from components in 0..1.
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Colour from 8-bit components.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
        )
    }

    /// HSV hue in 0..1.
    pub fn hue(&self) -> f64 {
        rgb_to_hsv(f64::from(self.r), f64::from(self.g), f64::from(self.b)).0
    }
}

/// Native colour of the stored body image; hue shifts are relative to it.
pub const REFERENCE_BODY_COLOR: Color = Color::new(0.451, 0.157, 0.678);

/// Clothes index meaning "leave the body colour alone".
pub const NO_SHIFT_INDEX: i32 = 20;

/// Favourite colours by clothes index.
pub const FAVORITE_COLORS: [Color; 12] = [
    Color::new(0.824, 0.118, 0.078), // red
    Color::new(1.000, 0.431, 0.098), // orange
    Color::new(1.000, 0.847, 0.125), // yellow
    Color::new(0.471, 0.824, 0.125), // light green
    Color::new(0.000, 0.471, 0.188), // green
    Color::new(0.039, 0.282, 0.706), // light blue
    Color::new(0.235, 0.667, 0.871), // blue
    Color::new(0.961, 0.353, 0.490), // pink
    Color::new(0.451, 0.157, 0.678), // purple
    Color::new(0.282, 0.220, 0.094), // brown
    Color::new(0.878, 0.878, 0.878), // white
    Color::new(0.094, 0.094, 0.078), // black
];

/// A validated clothes colour selection.
///
/// The sentinel index maps to no target at all so callers skip the shift
/// instead of rotating by an identity hue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClothesColor(Option<u8>);

impl ClothesColor {
    pub const NONE: ClothesColor = ClothesColor(None);

    /// Favourite colour by index; the no-shift index maps to [`NONE`](Self::NONE).
    pub fn from_index(index: i32) -> Result<Self> {
        match index {
            NO_SHIFT_INDEX => Ok(Self::NONE),
            0..=11 => Ok(Self(Some(index as u8))),
            other => Err(ImageError::InvalidColorIndex(other)),
        }
    }

    /// Favourite colour index, `None` for the sentinel.
    pub fn index(&self) -> Option<u8> {
        self.0
    }

    /// Target colour, `None` for the sentinel.
    pub fn target(&self) -> Option<Color> {
        self.0.map(|i| FAVORITE_COLORS[usize::from(i)])
    }
}

/// Rotate every pixel's hue so the reference body colour lands on `target`.
///
/// Alpha is copied unchanged. The input is never modified.
pub fn shift_hue(image: &PixelBuffer, target: Color) -> PixelBuffer {
    let shift = target.hue() - REFERENCE_BODY_COLOR.hue();

    let mut out = image.clone();
    for i in 0..plane_pixels(image) {
        let [r, g, b, a] = image.pixel_at(i);
        let (h, s, v) = rgb_to_hsv(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
        );
        let (r, g, b) = hsv_to_rgb((h + shift).rem_euclid(1.0), s, v);
        out.set_pixel_at(i, [to_byte(r), to_byte(g), to_byte(b), a]);
    }
    out
}

fn plane_pixels(image: &PixelBuffer) -> usize {
    image.width() as usize * image.height() as usize
}

// Truncates rather than rounds.
fn to_byte(component: f64) -> u8 {
    (component * 255.0).clamp(0.0, 255.0) as u8
}

/// RGB to HSV, all components in 0..1.
pub fn rgb_to_hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let v = max;
    if max == min {
        return (0.0, 0.0, v);
    }
    let range = max - min;
    let s = range / max;
    let rc = (max - r) / range;
    let gc = (max - g) / range;
    let bc = (max - b) / range;
    let h = if r == max {
        bc - gc
    } else if g == max {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    ((h / 6.0).rem_euclid(1.0), s, v)
}

/// HSV to RGB, all components in 0..1.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (v, v, v);
    }
    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (sector as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}
