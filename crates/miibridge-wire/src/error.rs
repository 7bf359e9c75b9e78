use bytes::Bytes;

use crate::version::ProtocolVersion;

/// Errors raised while encoding requests or framing responses.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The avatar descriptor is not exactly 96 bytes.
    #[error("store data must be exactly 96 bytes (got {len})")]
    InvalidDescriptor { len: usize },

    /// A field value does not fit the width the target version declares.
    #[error("{field} = {value} does not fit the {version} wire layout")]
    EncodingConstraintViolation {
        field: &'static str,
        value: i64,
        version: ProtocolVersion,
    },

    /// An expression index past the addressable range.
    #[error("expression index {index} out of range (limit 70)")]
    InvalidExpression { index: u32 },

    /// A decoded request field holds a value no variant maps to.
    #[error("invalid {field} value {value} in encoded request")]
    InvalidField { field: &'static str, value: i64 },

    /// The encoded request length does not match its version.
    #[error("encoded {version} request must be {expected} bytes (got {actual})")]
    TruncatedRequest {
        version: ProtocolVersion,
        expected: usize,
        actual: usize,
    },

    /// The peer closed before the expected byte count arrived.
    #[error("incomplete response ({received} of {expected} bytes)")]
    IncompleteResponse {
        expected: usize,
        received: usize,
        partial: Bytes,
    },

    /// The response header declares a layout this client cannot decode.
    #[error("unsupported response format: {0}")]
    UnsupportedFormat(String),

    /// The declared response size exceeds the configured maximum.
    #[error("response too large ({size} bytes, max {max})")]
    ResponseTooLarge { size: usize, max: usize },

    /// The GLB header magic is not `glTF`.
    #[error("invalid GLB magic {0:#010x}")]
    InvalidGlbMagic(u32),

    /// The renderer answered with an `ERROR: ` message instead of a payload.
    #[error("renderer reported: {0}")]
    RendererError(String),

    /// An I/O error occurred on the underlying stream.
    #[error("wire I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WireError>;
