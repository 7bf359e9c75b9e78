use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    /// Table on a terminal, JSON otherwise.
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize, Debug)]
pub struct RenderSummary {
    pub upstream: String,
    pub protocol: String,
    pub view: String,
    pub width: u32,
    pub height: u32,
    pub composited: bool,
    pub output: String,
    pub bytes_written: usize,
    pub elapsed_ms: u128,
}

/// Print the outcome of `render` in `format`.
pub fn print_render_summary(summary: &RenderSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(summary),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["UPSTREAM", "PROTOCOL", "VIEW", "SIZE", "BODY", "OUTPUT"])
                .add_row(vec![
                    summary.upstream.clone(),
                    summary.protocol.clone(),
                    summary.view.clone(),
                    format!("{}x{}", summary.width, summary.height),
                    if summary.composited { "yes" } else { "no" }.to_string(),
                    format!("{} ({} bytes)", summary.output, summary.bytes_written),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "rendered {}x{} {} via {} ({}) in {}ms -> {} ({} bytes{})",
                summary.width,
                summary.height,
                summary.view,
                summary.upstream,
                summary.protocol,
                summary.elapsed_ms,
                summary.output,
                summary.bytes_written,
                if summary.composited { ", body composited" } else { "" }
            );
        }
        OutputFormat::Raw => println!("{}", summary.output),
    }
}

#[derive(Serialize, Debug)]
pub struct EncodedRequest<'a> {
    pub protocol: String,
    pub request_len: usize,
    pub hex: &'a str,
}

/// Rows of 16 bytes for the table view of an encoded request.
const HEX_ROW: usize = 16;

/// Print an encoded request in `format`.
pub fn print_encoded(protocol: &str, bytes: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let hex = hex::encode(bytes);
            print_json(&EncodedRequest {
                protocol: protocol.to_string(),
                request_len: bytes.len(),
                hex: &hex,
            });
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["OFFSET", "BYTES"]);
            for (row, chunk) in bytes.chunks(HEX_ROW).enumerate() {
                table.add_row(vec![format!("{:#06x}", row * HEX_ROW), spaced_hex(chunk)]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", hex::encode(bytes)),
        OutputFormat::Raw => print_raw(bytes),
    }
}

/// Write bytes to stdout unchanged.
pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn spaced_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
