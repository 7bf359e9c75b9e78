//! Image side of a render: decoded buffers, hue rotation and compositing
//! of a head render onto a pre-rendered body.

pub mod body;
pub mod buffer;
pub mod color;
pub mod composite;
pub mod error;

pub use body::{BodyAsset, DEFAULT_BODY_NATIVE_RESOLUTION};
pub use buffer::{DepthBuffer, PixelBuffer};
pub use color::{
    shift_hue, ClothesColor, Color, FAVORITE_COLORS, NO_SHIFT_INDEX, REFERENCE_BODY_COLOR,
};
pub use composite::{composite, composite_body, CompositeConfig, DEFAULT_DEPTH_THRESHOLD};
pub use error::{ImageError, Result};
