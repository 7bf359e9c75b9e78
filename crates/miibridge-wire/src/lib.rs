//! Wire format for the render backend.
//!
//! A render is one request struct written to the stream, followed by one
//! response read back from it. Four incompatible request layouts exist in
//! deployment (see [`ProtocolVersion`]); the response is either a fixed
//! number of bytes computed from the request or a small header that declares
//! the payload size.
//!
//! ```
//! use miibridge_wire::{encode, ProtocolVersion, RenderRequest, StoreData};
//!
//! let request = RenderRequest {
//!     resolution: 512,
//!     ..RenderRequest::new(StoreData::from_slice(&[0u8; 96]).unwrap())
//! };
//! let bytes = encode(&request, ProtocolVersion::V3).unwrap();
//! assert_eq!(bytes.len(), 156);
//! ```

pub mod codec;
pub mod error;
pub mod framer;
pub mod glb;
pub mod request;
pub mod tga;
pub mod version;

pub use codec::{decode, encode};
pub use error::{Result, WireError};
pub use framer::{
    read_response, renderer_message, Accumulated, FramerConfig, ResponseFramer, TgaResponse,
    DEFAULT_MAX_RESPONSE_SIZE, RENDERER_ERROR_PREFIX,
};
pub use glb::{GlbHeader, GLB_HEADER_LEN, GLB_MAGIC};
pub use request::{
    DrawStageMode, ExpressionFlag, ModelFlags, ModelType, RenderRequest, ResponseFormat,
    SplitMode, StoreData, TexResolution, ViewType, EXPRESSION_LIMIT, STORE_DATA_LEN,
};
pub use tga::{TgaHeader, TGA_HEADER_LEN};
pub use version::{ProtocolVersion, ResponseLayout};
