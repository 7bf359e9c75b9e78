//! Stand-in render backend for trying the CLI without the real renderer.
//!
//! Answers every request with a flat-coloured head on the upper half of the
//! canvas and empty background below, in whichever layout the request asks
//! for.
//!
//! Run with:
//!   cargo run --example stub_renderer -- 127.0.0.1:12346 v3
//!
//! In another terminal:
//!   cargo run --features cli -- render --data <hex> --view face_only \
//!     --body body.png --output out.png

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};

use miibridge::wire::{
    decode, GlbHeader, ProtocolVersion, RenderRequest, ResponseFormat, ResponseLayout, TgaHeader,
};

const HEAD: [u8; 4] = [250, 200, 180, 255];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| "127.0.0.1:12346".to_string());
    let version: ProtocolVersion = match args.next() {
        Some(arg) => arg.parse()?,
        None => ProtocolVersion::V3,
    };

    let listener = TcpListener::bind(&addr)?;
    eprintln!("Stub renderer speaking {version} on {}", listener.local_addr()?);

    for stream in listener.incoming() {
        let mut stream = stream?;
        if let Err(e) = serve(&mut stream, version) {
            eprintln!("Request failed: {e}");
        }
    }
    Ok(())
}

fn serve(
    stream: &mut TcpStream,
    version: ProtocolVersion,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut buf = vec![0u8; version.request_len()];
    stream.read_exact(&mut buf)?;

    let request = match decode(&buf, version) {
        Ok(request) => request,
        Err(e) => {
            stream.write_all(format!("ERROR: {e}\0").as_bytes())?;
            return Ok(());
        }
    };
    eprintln!(
        "Rendering {}x{} {} ({:?})",
        request.resolution, request.resolution, request.view_type, request.response_format
    );

    let response = respond(&request, version)?;
    stream.write_all(&response)?;
    stream.flush()?;
    Ok(())
}

fn respond(
    request: &RenderRequest,
    version: ProtocolVersion,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let side = request.resolution;
    let head_rows = side / 2;
    let head = if request.response_format == ResponseFormat::Tga {
        [HEAD[2], HEAD[1], HEAD[0], HEAD[3]]
    } else {
        HEAD
    };
    let mut pixels = Vec::with_capacity((side * side * 4) as usize);
    let mut depth = Vec::with_capacity((side * side * 4) as usize);
    for row in 0..side {
        for _ in 0..side {
            let (pixel, z) = if row < head_rows { (head, 0.5f32) } else { ([0; 4], 1.0) };
            pixels.extend_from_slice(&pixel);
            depth.extend_from_slice(&z.to_le_bytes());
        }
    }

    let response = match version.response_layout(request) {
        ResponseLayout::PixelsAndDepth { .. } => [pixels, depth].concat(),
        ResponseLayout::Pixels { .. } => pixels,
        ResponseLayout::Tga => {
            let side = u16::try_from(side)?;
            [TgaHeader::rgba(side, side).to_bytes().to_vec(), pixels].concat()
        }
        ResponseLayout::Glb => {
            let mut out = Vec::new();
            GlbHeader::new(12).write_to(&mut out);
            out
        }
    };
    Ok(response)
}
