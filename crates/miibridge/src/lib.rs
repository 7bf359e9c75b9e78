//! Client for the Mii render backend.
//!
//! miibridge encodes render requests in the backend's versioned wire layouts,
//! frames and decodes the responses, and composites head-only renders onto a
//! pre-rendered body.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP and Unix socket endpoints with a per-call deadline
//! - [`wire`]: request codec, TGA/GLB headers and the response framer
//! - [`image`]: pixel and depth buffers, hue shift, body compositing
//! - [`client`]: render client, renderer facade and descriptor lookup
//!
//! ```no_run
//! use miibridge::client::{ClientConfig, RenderClient};
//! use miibridge::transport::Endpoint;
//! use miibridge::wire::{ProtocolVersion, RenderRequest, StoreData};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint: Endpoint = "localhost:12346".parse()?;
//! let client = RenderClient::new(endpoint, ClientConfig::default());
//! let request = RenderRequest::new(StoreData::from([0u8; 96]));
//! let output = client.render(&request, ProtocolVersion::V3)?;
//! println!("{}x{}", output.pixels.width(), output.pixels.height());
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use miibridge_transport::*;
}

/// Re-export wire types.
pub mod wire {
    pub use miibridge_wire::*;
}

/// Re-export image types.
pub mod image {
    pub use miibridge_image::*;
}

/// Re-export client types.
pub mod client {
    pub use miibridge_client::*;
}
