use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use miibridge::client::{ClientConfig, RenderClient, RenderJob, Renderer};
use miibridge::image::{BodyAsset, ClothesColor, CompositeConfig, PixelBuffer};
use miibridge::wire::{ProtocolVersion, ResponseFormat, TgaHeader, ViewType, TGA_HEADER_LEN};
use tracing::info;

use crate::cmd::{parse_duration, ImageFormatArg, RenderArgs};
use crate::exit::{
    image_error, io_error, render_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE,
};
use crate::output::{print_raw, print_render_summary, OutputFormat, RenderSummary};

/// Render against the upstream and write the image.
pub fn run(args: RenderArgs, format: OutputFormat) -> CliResult<i32> {
    let request = args.request.build()?;
    let version = args.request.protocol;
    let config = ClientConfig {
        connect_timeout: parse_duration(&args.connect_timeout)?,
        deadline: parse_duration(&args.timeout)?,
        ..ClientConfig::default()
    };
    let client = RenderClient::new(args.upstream.clone(), config);
    let started = Instant::now();

    let (encoded, composited) = if request.response_format == ResponseFormat::Gltf {
        if !matches!(version, ProtocolVersion::V3 | ProtocolVersion::V4) {
            return Err(CliError::new(
                USAGE,
                format!("glTF export needs --protocol v3 or v4 (got {version})"),
            ));
        }
        let file = client
            .render_gltf(&request, version)
            .map_err(|err| render_error("render failed", err))?;
        (file.to_vec(), false)
    } else {
        let renderer = build_renderer(client, &args)?;
        let composited = renderer.body().is_some() && request.view_type == ViewType::FaceOnly;
        let job = RenderJob {
            clothes_color: clothes_color(args.request.clothes_color)?,
            ..RenderJob::new(request.clone(), version)
        };
        let pixels = renderer
            .render_and_composite(&job)
            .map_err(|err| render_error("render failed", err))?;
        (encode_image(&pixels, image_format(&args))?, composited)
    };

    let bytes_written = write_output(&args.output, &encoded)?;
    let summary = RenderSummary {
        upstream: args.upstream.to_string(),
        protocol: version.to_string(),
        view: request.view_type.to_string(),
        width: request.resolution,
        height: request.resolution,
        composited,
        output: args.output.clone(),
        bytes_written,
        elapsed_ms: started.elapsed().as_millis(),
    };

    if args.output == "-" {
        info!(bytes = bytes_written, composited, "image written to stdout");
    } else {
        print_render_summary(&summary, format);
    }
    Ok(SUCCESS)
}

fn build_renderer(client: RenderClient, args: &RenderArgs) -> CliResult<Renderer> {
    let renderer = Renderer::new(client).with_composite_config(CompositeConfig {
        depth_threshold: args.depth_threshold,
        body_native_resolution: args.body_resolution,
        ..CompositeConfig::default()
    });
    let Some(path) = &args.body else {
        return Ok(renderer);
    };

    let body = BodyAsset::load(path)
        .map_err(|err| image_error(&format!("failed loading body {}", path.display()), err))?;
    Ok(renderer.with_body(Arc::new(body)))
}

/// -1 and the no-shift sentinel both leave the body as drawn.
fn clothes_color(index: Option<i32>) -> CliResult<ClothesColor> {
    match index {
        None | Some(-1) => Ok(ClothesColor::NONE),
        Some(index) => ClothesColor::from_index(index)
            .map_err(|err| CliError::new(DATA_INVALID, format!("--clothes-color: {err}"))),
    }
}

fn image_format(args: &RenderArgs) -> ImageFormatArg {
    if let Some(format) = args.image_format {
        return format;
    }
    let is_tga = Path::new(&args.output)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tga"));
    if is_tga {
        ImageFormatArg::Tga
    } else {
        ImageFormatArg::Png
    }
}

fn encode_image(pixels: &PixelBuffer, format: ImageFormatArg) -> CliResult<Vec<u8>> {
    match format {
        ImageFormatArg::Png => {
            let mut png = Vec::new();
            pixels
                .to_rgba_image()
                .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
                .map_err(|err| CliError::new(DATA_INVALID, format!("PNG encode failed: {err}")))?;
            Ok(png)
        }
        ImageFormatArg::Tga => encode_tga(pixels),
    }
}

/// Top-left origin, BGRA, behind the same 18-byte header the backend sends.
fn encode_tga(pixels: &PixelBuffer) -> CliResult<Vec<u8>> {
    let (width, height) = pixels.dimensions();
    let too_large =
        || CliError::new(DATA_INVALID, format!("{width}x{height} does not fit a TGA header"));
    let header = TgaHeader::rgba(
        u16::try_from(width).map_err(|_| too_large())?,
        u16::try_from(height).map_err(|_| too_large())?,
    );

    let mut bgra = pixels.clone();
    bgra.swap_red_blue();
    let mut out = Vec::with_capacity(TGA_HEADER_LEN + header.payload_len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(bgra.as_bytes());
    Ok(out)
}

fn write_output(output: &str, bytes: &[u8]) -> CliResult<usize> {
    if output == "-" {
        print_raw(bytes);
    } else {
        fs::write(output, bytes).map_err(|err| io_error(&format!("failed writing {output}"), err))?;
    }
    Ok(bytes.len())
}
