use std::fmt;
use std::str::FromStr;

use crate::request::{RenderRequest, ResponseFormat};

/// Request layouts found in deployment.
///
/// | version | request | response |
/// |---------|---------|----------|
/// | V1 | 112 bytes | fixed RGBA followed by f32 depth |
/// | V2 | 140 bytes | fixed RGBA |
/// | V3 | 156 bytes | TGA header + RGBA, or a GLB file |
/// | V4 | 160 bytes | as V3 |
///
/// V4 is V3 with the hat type and colour inserted after the body type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ProtocolVersion {
    V1,
    V2,
    #[default]
    V3,
    V4,
}

/// How the response to a request is framed on the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseLayout {
    /// Fixed RGBA block then a fixed little-endian f32 depth block.
    PixelsAndDepth { pixel_len: usize, depth_len: usize },
    /// Fixed RGBA block.
    Pixels { len: usize },
    /// 18-byte TGA header declaring the RGBA payload.
    Tga,
    /// Binary glTF file, length declared in its 12-byte header.
    Glb,
}

impl ResponseLayout {
    /// Byte count known before reading, if any.
    pub fn fixed_len(&self) -> Option<usize> {
        match *self {
            ResponseLayout::PixelsAndDepth {
                pixel_len,
                depth_len,
            } => Some(pixel_len.saturating_add(depth_len)),
            ResponseLayout::Pixels { len } => Some(len),
            ResponseLayout::Tga | ResponseLayout::Glb => None,
        }
    }
}

impl ProtocolVersion {
    pub const ALL: [ProtocolVersion; 4] = [
        ProtocolVersion::V1,
        ProtocolVersion::V2,
        ProtocolVersion::V3,
        ProtocolVersion::V4,
    ];

    /// Size of an encoded request.
    pub fn request_len(self) -> usize {
        match self {
            ProtocolVersion::V1 => 112,
            ProtocolVersion::V2 => 140,
            ProtocolVersion::V3 => 156,
            ProtocolVersion::V4 => 160,
        }
    }

    /// Response framing the renderer uses for `request` under this version.
    pub fn response_layout(self, request: &RenderRequest) -> ResponseLayout {
        let plane = rgba_len(request.resolution);
        match self {
            ProtocolVersion::V1 => ResponseLayout::PixelsAndDepth {
                pixel_len: plane,
                // One f32 per pixel is also four bytes.
                depth_len: plane,
            },
            ProtocolVersion::V2 => ResponseLayout::Pixels { len: plane },
            ProtocolVersion::V3 | ProtocolVersion::V4 => match request.response_format {
                ResponseFormat::Gltf => ResponseLayout::Glb,
                ResponseFormat::Rgba | ResponseFormat::Tga => ResponseLayout::Tga,
            },
        }
    }

    /// Version number, 1 to 4.
    pub fn as_u8(self) -> u8 {
        match self {
            ProtocolVersion::V1 => 1,
            ProtocolVersion::V2 => 2,
            ProtocolVersion::V3 => 3,
            ProtocolVersion::V4 => 4,
        }
    }
}

// Saturates so oversize resolutions surface as ResponseTooLarge in the framer.
fn rgba_len(resolution: u32) -> usize {
    let side = usize::try_from(resolution).unwrap_or(usize::MAX);
    side.saturating_mul(side).saturating_mul(4)
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.as_u8())
    }
}

impl FromStr for ProtocolVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "v1" => Ok(ProtocolVersion::V1),
            "2" | "v2" => Ok(ProtocolVersion::V2),
            "3" | "v3" => Ok(ProtocolVersion::V3),
            "4" | "v4" => Ok(ProtocolVersion::V4),
            other => Err(format!(
                "unknown protocol version {other:?} (expected v1, v2, v3 or v4)"
            )),
        }
    }
}
