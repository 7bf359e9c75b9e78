use bytes::{Buf, BufMut};

/// Size of the binary glTF header.
pub const GLB_HEADER_LEN: usize = 12;

/// `"glTF"` read as a little-endian u32.
pub const GLB_MAGIC: u32 = 0x4654_6C67;

/// Binary glTF header; `length` covers the whole file including itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlbHeader {
    pub magic: u32,
    pub version: u32,
    pub length: u32,
}

impl GlbHeader {
    /// glTF 2.0 header for a file of `length` bytes in total.
    pub fn new(length: u32) -> Self {
        Self {
            magic: GLB_MAGIC,
            version: 2,
            length,
        }
    }

    /// Read a header from its 12 wire bytes; check [`has_valid_magic`](Self::has_valid_magic).
    pub fn parse(bytes: &[u8; GLB_HEADER_LEN]) -> Self {
        let mut src = &bytes[..];
        Self {
            magic: src.get_u32_le(),
            version: src.get_u32_le(),
            length: src.get_u32_le(),
        }
    }

    /// Append the 12 header bytes to `dst`.
    pub fn write_to(&self, dst: &mut impl BufMut) {
        dst.put_u32_le(self.magic);
        dst.put_u32_le(self.version);
        dst.put_u32_le(self.length);
    }

    /// Whether the file starts with `glTF`.
    pub fn has_valid_magic(&self) -> bool {
        self.magic == GLB_MAGIC
    }
}
