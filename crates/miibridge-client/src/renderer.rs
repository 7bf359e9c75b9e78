use std::sync::Arc;

use miibridge_image::{composite_body, BodyAsset, ClothesColor, CompositeConfig, PixelBuffer};
use miibridge_wire::{ProtocolVersion, RenderRequest, ViewType};
use tracing::debug;

use crate::client::RenderClient;
use crate::error::Result;

/// One unit of work for [`Renderer::render_and_composite`].
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub request: RenderRequest,
    pub version: ProtocolVersion,
    /// Body recolour; [`ClothesColor::NONE`] keeps the asset's colours.
    pub clothes_color: ClothesColor,
}

impl RenderJob {
    /// Job with the body left in its own colours.
    pub fn new(request: RenderRequest, version: ProtocolVersion) -> Self {
        Self {
            request,
            version,
            clothes_color: ClothesColor::NONE,
        }
    }
}

/// Render client plus the optional head-on-body composite step.
#[derive(Debug, Clone)]
pub struct Renderer {
    client: RenderClient,
    body: Option<Arc<BodyAsset>>,
    composite: CompositeConfig,
}

impl Renderer {
    /// Renderer without a body; head-only renders pass through.
    pub fn new(client: RenderClient) -> Self {
        Self {
            client,
            body: None,
            composite: CompositeConfig::default(),
        }
    }

    /// Attach the shared body image used for head-only renders.
    pub fn with_body(mut self, body: Arc<BodyAsset>) -> Self {
        self.body = Some(body);
        self
    }

    /// Replace the compositing parameters.
    pub fn with_composite_config(mut self, config: CompositeConfig) -> Self {
        self.composite = config;
        self
    }

    /// Borrow the underlying render client.
    pub fn client(&self) -> &RenderClient {
        &self.client
    }

    /// Attached body image, if any.
    pub fn body(&self) -> Option<&Arc<BodyAsset>> {
        self.body.as_ref()
    }

    /// Render the job and, for head-only views with a body attached, merge
    /// the head onto the (optionally recoloured) body.
    ///
    /// Versions without a depth plane fall back to head alpha for the
    /// background test.
    pub fn render_and_composite(&self, job: &RenderJob) -> Result<PixelBuffer> {
        let output = self.client.render(&job.request, job.version)?;

        let body = match &self.body {
            Some(body) if job.request.view_type == ViewType::FaceOnly => body,
            _ => return Ok(output.pixels),
        };

        debug!(
            clothes_color = ?job.clothes_color.index(),
            has_depth = output.depth.is_some(),
            "compositing head onto body"
        );
        let config = CompositeConfig {
            alpha_fallback: output.depth.is_none(),
            ..self.composite
        };
        let merged = composite_body(
            &output.pixels,
            output.depth.as_ref(),
            body,
            job.clothes_color.target(),
            &config,
        )?;
        Ok(merged)
    }
}
