/// Errors from building buffers or compositing them.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// Raw data length does not match the declared dimensions.
    #[error("buffer of {width}x{height} needs {expected} bytes (got {actual})")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// Two buffers that must line up have different dimensions.
    #[error("dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Clothes colour index outside the favourite colour table.
    #[error("invalid clothes color index {0} (expected 0..=11, or 20 for none)")]
    InvalidColorIndex(i32),

    /// Loading or encoding an image file failed.
    #[error("image codec error: {0}")]
    Decode(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, ImageError>;
