//! Client side of the render backend.
//!
//! [`RenderClient`] runs one encode, send, frame and decode exchange per
//! call. [`Renderer`] adds the optional body composite on top and is what a
//! request-serving layer holds on to.

pub mod client;
pub mod config;
pub mod error;
pub mod lookup;
pub mod renderer;

#[cfg(test)]
pub(crate) mod stub;

pub use client::{RenderClient, RenderOutput};
pub use config::ClientConfig;
pub use error::{RenderError, Result};
pub use lookup::{normalize_account_id, DescriptorLookup, DirectoryLookup, MemoryLookup};
pub use renderer::{RenderJob, Renderer};
