//! Stream transport to the render backend.
//!
//! The backend speaks a one-shot request/response protocol over a plain
//! stream socket:
//! - TCP (`host:port`, default port 12346)
//! - Unix domain sockets (`unix:/path`, Unix only)
//!
//! This is the lowest layer of miibridge. Everything else builds on top of
//! the [`RenderStream`] type provided here.

pub mod endpoint;
pub mod error;
pub mod stream;

pub use endpoint::{Endpoint, DEFAULT_PORT};
pub use error::{Result, TransportError};
pub use stream::RenderStream;
