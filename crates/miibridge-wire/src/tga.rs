use bytes::{Buf, BufMut};

use crate::error::{Result, WireError};

/// Size of the TGA header that precedes V3 image responses.
pub const TGA_HEADER_LEN: usize = 18;

/// Uncompressed true-colour image type.
pub const IMAGE_TYPE_TRUE_COLOR: u8 = 2;

const DESCRIPTOR_TOP_LEFT: u8 = 1 << 5;
const DESCRIPTOR_ALPHA_BITS: u8 = 8;

/// TGA file header, little-endian, as the renderer writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TgaHeader {
    pub id_length: u8,
    pub color_map_type: u8,
    pub image_type: u8,
    pub color_map_origin: u16,
    pub color_map_length: u16,
    pub color_map_depth: u8,
    pub origin_x: u16,
    pub origin_y: u16,
    pub width: u16,
    pub height: u16,
    pub bits_per_pixel: u8,
    pub image_descriptor: u8,
}

impl TgaHeader {
    /// Header for an uncompressed 32-bit top-left-origin image.
    pub fn rgba(width: u16, height: u16) -> Self {
        Self {
            image_type: IMAGE_TYPE_TRUE_COLOR,
            width,
            height,
            bits_per_pixel: 32,
            image_descriptor: DESCRIPTOR_TOP_LEFT | DESCRIPTOR_ALPHA_BITS,
            ..Self::default()
        }
    }

    /// Read a header from its 18 wire bytes. No validation is done here.
    pub fn parse(bytes: &[u8; TGA_HEADER_LEN]) -> Self {
        let mut src = &bytes[..];
        Self {
            id_length: src.get_u8(),
            color_map_type: src.get_u8(),
            image_type: src.get_u8(),
            color_map_origin: src.get_u16_le(),
            color_map_length: src.get_u16_le(),
            color_map_depth: src.get_u8(),
            origin_x: src.get_u16_le(),
            origin_y: src.get_u16_le(),
            width: src.get_u16_le(),
            height: src.get_u16_le(),
            bits_per_pixel: src.get_u8(),
            image_descriptor: src.get_u8(),
        }
    }

    /// Append the 18 header bytes to `dst`.
    pub fn write_to(&self, dst: &mut impl BufMut) {
        dst.put_u8(self.id_length);
        dst.put_u8(self.color_map_type);
        dst.put_u8(self.image_type);
        dst.put_u16_le(self.color_map_origin);
        dst.put_u16_le(self.color_map_length);
        dst.put_u8(self.color_map_depth);
        dst.put_u16_le(self.origin_x);
        dst.put_u16_le(self.origin_y);
        dst.put_u16_le(self.width);
        dst.put_u16_le(self.height);
        dst.put_u8(self.bits_per_pixel);
        dst.put_u8(self.image_descriptor);
    }

    /// Header as a fixed byte array.
    pub fn to_bytes(&self) -> [u8; TGA_HEADER_LEN] {
        let mut out = [0u8; TGA_HEADER_LEN];
        self.write_to(&mut &mut out[..]);
        out
    }

    /// Reject anything other than 32 bits per pixel.
    pub fn validate(&self) -> Result<()> {
        if self.bits_per_pixel != 32 {
            return Err(WireError::UnsupportedFormat(format!(
                "TGA with {} bits per pixel (only 32 is supported)",
                self.bits_per_pixel
            )));
        }
        Ok(())
    }

    /// Payload bytes following the header.
    pub fn payload_len(&self) -> usize {
        usize::from(self.width) * usize::from(self.height) * 4
    }

    /// Rows run top to bottom when bit 5 of the descriptor is set.
    pub fn is_top_left(&self) -> bool {
        self.image_descriptor & DESCRIPTOR_TOP_LEFT != 0
    }
}
