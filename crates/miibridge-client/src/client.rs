use std::io::{self, Write};
use std::time::Instant;

use bytes::Bytes;
use miibridge_image::{DepthBuffer, PixelBuffer};
use miibridge_transport::{Endpoint, RenderStream};
use miibridge_wire::{
    encode, FramerConfig, ProtocolVersion, RenderRequest, ResponseFormat, ResponseFramer,
    ResponseLayout, WireError,
};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{RenderError, Result};

/// Decoded result of one render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub pixels: PixelBuffer,
    /// Only the V1 layout carries depth.
    pub depth: Option<DepthBuffer>,
}

/// Renders against one backend endpoint.
///
/// Holds no connection state: every call opens its own connection and drops
/// it when the response is read, so one client can be shared across threads.
#[derive(Debug, Clone)]
pub struct RenderClient {
    endpoint: Endpoint,
    config: ClientConfig,
}

impl RenderClient {
    /// Create a client for `endpoint`. Nothing connects until a render.
    pub fn new(endpoint: Endpoint, config: ClientConfig) -> Self {
        Self { endpoint, config }
    }

    /// Backend this client renders against.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Current client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Render `request` as pixels (and depth, for V1).
    ///
    /// glTF output is not an image; use [`render_gltf`](Self::render_gltf).
    pub fn render(
        &self,
        request: &RenderRequest,
        version: ProtocolVersion,
    ) -> Result<RenderOutput> {
        let layout = version.response_layout(request);
        if layout == ResponseLayout::Glb {
            return Err(RenderError::UnsupportedResponseFormat {
                format: request.response_format,
                version,
            });
        }

        let started = Instant::now();
        let mut framer = self.exchange(request, version)?;
        let side = request.resolution;

        let output = match layout {
            ResponseLayout::PixelsAndDepth { pixel_len, .. } => {
                let total = layout.fixed_len().unwrap_or(pixel_len);
                let bytes = framer.read_fixed(total).map_err(|err| self.wire_error(err))?;
                let (pixels, depth) = bytes.split_at(pixel_len);
                RenderOutput {
                    pixels: PixelBuffer::from_raw(side, side, pixels.to_vec())?,
                    depth: Some(DepthBuffer::from_le_bytes(side, side, depth)?),
                }
            }
            ResponseLayout::Pixels { len } => {
                let bytes = framer.read_fixed(len).map_err(|err| self.wire_error(err))?;
                RenderOutput {
                    pixels: PixelBuffer::from_raw(side, side, bytes.to_vec())?,
                    depth: None,
                }
            }
            ResponseLayout::Tga => {
                let response = framer.read_tga().map_err(|err| self.wire_error(err))?;
                let header = response.header;
                let mut pixels = PixelBuffer::from_raw(
                    u32::from(header.width),
                    u32::from(header.height),
                    response.pixels.to_vec(),
                )?;
                if request.response_format == ResponseFormat::Tga {
                    pixels.swap_red_blue();
                    if !header.is_top_left() {
                        pixels.flip_vertical();
                    }
                }
                RenderOutput {
                    pixels,
                    depth: None,
                }
            }
            ResponseLayout::Glb => {
                return Err(RenderError::UnsupportedResponseFormat {
                    format: request.response_format,
                    version,
                })
            }
        };

        info!(
            endpoint = %self.endpoint,
            %version,
            width = output.pixels.width(),
            height = output.pixels.height(),
            depth = output.depth.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "render complete"
        );
        Ok(output)
    }

    /// Export the model as a binary glTF file (V3 and later).
    pub fn render_gltf(&self, request: &RenderRequest, version: ProtocolVersion) -> Result<Bytes> {
        let request = RenderRequest {
            response_format: ResponseFormat::Gltf,
            ..request.clone()
        };
        if version.response_layout(&request) != ResponseLayout::Glb {
            return Err(RenderError::UnsupportedResponseFormat {
                format: ResponseFormat::Gltf,
                version,
            });
        }

        let started = Instant::now();
        let mut framer = self.exchange(&request, version)?;
        let file = framer.read_glb().map_err(|err| self.wire_error(err))?;
        info!(
            endpoint = %self.endpoint,
            %version,
            len = file.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "glTF export complete"
        );
        Ok(file)
    }

    fn exchange(
        &self,
        request: &RenderRequest,
        version: ProtocolVersion,
    ) -> Result<ResponseFramer<RenderStream>> {
        // Encoding failures never reach the network.
        let payload = encode(request, version)?;

        let mut stream = self
            .endpoint
            .connect(Some(self.config.connect_timeout))?;
        stream.set_deadline(Some(self.config.deadline));

        stream
            .write_all(&payload)
            .and_then(|()| stream.flush())
            .map_err(|err| self.io_error(err))?;
        debug!(endpoint = %self.endpoint, %version, len = payload.len(), "sent render request");

        Ok(ResponseFramer::with_config(
            stream,
            FramerConfig {
                max_response_size: self.config.max_response_size,
            },
        ))
    }

    fn wire_error(&self, err: WireError) -> RenderError {
        match err {
            WireError::Io(err) => self.io_error(err),
            err @ WireError::IncompleteResponse { .. } => {
                let err = RenderError::from(err);
                if let RenderError::RendererMessage(message) = &err {
                    warn!(endpoint = %self.endpoint, %message, "renderer returned an error");
                }
                err
            }
            other => other.into(),
        }
    }

    fn io_error(&self, err: io::Error) -> RenderError {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => RenderError::UpstreamTimeout {
                endpoint: self.endpoint.to_string(),
            },
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => RenderError::UpstreamUnreachable {
                endpoint: self.endpoint.to_string(),
                source: err,
            },
            _ => RenderError::Io(err),
        }
    }
}
