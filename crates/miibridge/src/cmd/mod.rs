use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use miibridge::client::{DescriptorLookup, DirectoryLookup};
use miibridge::image::{DEFAULT_BODY_NATIVE_RESOLUTION, DEFAULT_DEPTH_THRESHOLD, NO_SHIFT_INDEX};
use miibridge::transport::Endpoint;
use miibridge::wire::{
    ExpressionFlag, ModelFlags, ModelType, ProtocolVersion, RenderRequest, ResponseFormat,
    StoreData, TexResolution, ViewType,
};

use crate::descriptor::parse_descriptor;
use crate::exit::{io_error, render_error, CliError, CliResult, DATA_INVALID, USAGE};
use crate::output::OutputFormat;

pub mod encode;
pub mod render;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render an avatar against the backend and write the image.
    Render(RenderArgs),
    /// Print the encoded request without connecting.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Dispatch a subcommand.
pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Render(args) => render::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ResponseFormatArg {
    Rgba,
    Gltf,
    Tga,
}

impl From<ResponseFormatArg> for ResponseFormat {
    fn from(arg: ResponseFormatArg) -> Self {
        match arg {
            ResponseFormatArg::Rgba => ResponseFormat::Rgba,
            ResponseFormatArg::Gltf => ResponseFormat::Gltf,
            ResponseFormatArg::Tga => ResponseFormat::Tga,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ModelTypeArg {
    Normal,
    Hat,
    FaceOnly,
}

impl From<ModelTypeArg> for ModelType {
    fn from(arg: ModelTypeArg) -> Self {
        match arg {
            ModelTypeArg::Normal => ModelType::Normal,
            ModelTypeArg::Hat => ModelType::Hat,
            ModelTypeArg::FaceOnly => ModelType::FaceOnly,
        }
    }
}

/// Request fields shared by `render` and `encode`. Unset options keep the
/// request defaults.
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Avatar descriptor as hex or base64.
    #[arg(long, short = 'd', conflicts_with_all = ["data_file", "account"])]
    pub data: Option<String>,
    /// Read the raw 96-byte descriptor from a file.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["data", "account"])]
    pub data_file: Option<PathBuf>,
    /// Look the descriptor up by account id.
    #[arg(long, requires = "lookup_dir", conflicts_with_all = ["data", "data_file"])]
    pub account: Option<String>,
    /// Directory of `<account>.bin` descriptors.
    #[arg(long, value_name = "DIR", env = "MIIBRIDGE_LOOKUP_DIR")]
    pub lookup_dir: Option<PathBuf>,

    /// Wire layout spoken to the backend.
    #[arg(long, short = 'p', default_value = "v3")]
    pub protocol: ProtocolVersion,
    /// Output image side in pixels.
    #[arg(long, short = 'r', default_value_t = 1024)]
    pub resolution: u32,
    /// Texture resolution.
    #[arg(long)]
    pub tex_resolution: Option<u32>,
    /// Generate texture mipmaps.
    #[arg(long)]
    pub mipmap: bool,
    /// Camera framing (face, face_only, all_body, ...).
    #[arg(long, default_value = "face")]
    pub view: ViewType,
    /// Single expression index.
    #[arg(long)]
    pub expression: Option<u32>,
    /// Expression indices to combine (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub expressions: Option<Vec<u32>>,
    #[arg(long, value_name = "FORMAT", default_value = "rgba")]
    pub response_format: ResponseFormatArg,
    #[arg(long, default_value = "normal")]
    pub model_type: ModelTypeArg,
    #[arg(long)]
    pub flatten_nose: bool,
    /// Background colour as RRGGBBAA hex.
    #[arg(long, value_name = "RRGGBBAA")]
    pub background: Option<String>,
    /// Camera rotation in degrees (x,y,z).
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub camera_rotate: Option<Vec<i32>>,
    /// Model rotation in degrees (x,y,z).
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub model_rotate: Option<Vec<i32>>,
    /// Light direction (x,y,z).
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub light_direction: Option<Vec<i32>>,
    /// Render without lighting.
    #[arg(long)]
    pub no_light: bool,
    /// Favourite colour index for the clothes; also recolours the body.
    #[arg(long, allow_negative_numbers = true)]
    pub clothes_color: Option<i32>,
    #[arg(long, allow_negative_numbers = true)]
    pub pants_color: Option<i32>,
    #[arg(long, allow_negative_numbers = true)]
    pub body_type: Option<i32>,
    /// Hat type: 0 all, 1 hat only, 2 face only, 3 bald (v4 only).
    #[arg(long)]
    pub hat_type: Option<u32>,
    /// Hat colour, 0 for the model default (v4 only).
    #[arg(long)]
    pub hat_color: Option<u32>,
    #[arg(long)]
    pub shader_type: Option<i32>,
    #[arg(long)]
    pub aa_method: Option<u32>,
    #[arg(long)]
    pub instance_count: Option<u32>,
}

impl RequestArgs {
    /// Resolve the descriptor from whichever input flag was given.
    pub fn store_data(&self) -> CliResult<StoreData> {
        if let Some(data) = &self.data {
            return parse_descriptor(data);
        }
        if let Some(path) = &self.data_file {
            let bytes = fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
            return StoreData::from_slice(&bytes)
                .map_err(|err| CliError::new(DATA_INVALID, format!("{}: {err}", path.display())));
        }
        if let (Some(account), Some(dir)) = (&self.account, &self.lookup_dir) {
            return DirectoryLookup::new(dir)
                .lookup(account)
                .map_err(|err| render_error("lookup failed", err));
        }
        Err(CliError::new(
            USAGE,
            "one of --data, --data-file or --account is required",
        ))
    }

    /// Build the request from the flags.
    pub fn build(&self) -> CliResult<RenderRequest> {
        let mut request = RenderRequest {
            resolution: self.resolution,
            view_type: self.view,
            response_format: self.response_format.into(),
            model_flags: ModelFlags {
                model_type: self.model_type.into(),
                flatten_nose: self.flatten_nose,
            },
            light_enable: !self.no_light,
            ..RenderRequest::new(self.store_data()?)
        };

        if let Some(value) = self.tex_resolution {
            request.tex_resolution = TexResolution::new(value);
        }
        if self.mipmap {
            request.tex_resolution.mipmap = true;
        }
        if let Some(expression) = self.expression {
            request.expression = expression;
        }
        if let Some(indices) = &self.expressions {
            let mut flag = ExpressionFlag::empty();
            for &index in indices {
                flag.set(index)
                    .map_err(|err| CliError::new(USAGE, format!("--expressions: {err}")))?;
            }
            request.expression_flag = flag;
        }
        if let Some(background) = &self.background {
            request.background_color = parse_rgba(background)?;
        }
        if let Some(values) = &self.camera_rotate {
            request.camera_rotate = triple("--camera-rotate", values)?;
        }
        if let Some(values) = &self.model_rotate {
            request.model_rotate = triple("--model-rotate", values)?;
        }
        if let Some(values) = &self.light_direction {
            request.light_direction = triple("--light-direction", values)?;
        }
        if let Some(index) = self.clothes_color {
            request.clothes_color = if index == NO_SHIFT_INDEX { -1 } else { index };
        }
        if let Some(index) = self.pants_color {
            request.pants_color = index;
        }
        if let Some(body_type) = self.body_type {
            request.body_type = body_type;
        }
        if let Some(hat_type) = self.hat_type {
            request.hat_type = hat_type;
        }
        if let Some(hat_color) = self.hat_color {
            request.hat_color = hat_color;
        }
        if let Some(shader_type) = self.shader_type {
            request.shader_type = shader_type;
        }
        if let Some(aa_method) = self.aa_method {
            request.aa_method = aa_method;
        }
        if let Some(count) = self.instance_count {
            request.instance_count = count;
        }
        Ok(request)
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ImageFormatArg {
    Png,
    Tga,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub request: RequestArgs,
    /// Render backend (host[:port] or unix:/path).
    #[arg(long, env = "MIIBRIDGE_UPSTREAM", default_value = "localhost:12346")]
    pub upstream: Endpoint,
    /// Connection timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub connect_timeout: String,
    /// Bound on the whole exchange once connected.
    #[arg(long, default_value = "30s")]
    pub timeout: String,
    /// Body image composited under head-only renders.
    #[arg(long, value_name = "IMAGE", env = "MIIBRIDGE_BODY")]
    pub body: Option<PathBuf>,
    /// Output resolution the body image was drawn for.
    #[arg(long, default_value_t = DEFAULT_BODY_NATIVE_RESOLUTION)]
    pub body_resolution: u32,
    /// Head depth above which the body shows through.
    #[arg(long, env = "MIIBRIDGE_DEPTH_THRESHOLD", default_value_t = DEFAULT_DEPTH_THRESHOLD)]
    pub depth_threshold: f32,
    /// Output file, `-` for stdout.
    #[arg(long, short = 'o', default_value = "-")]
    pub output: String,
    /// Image encoding. Default: from the output extension, else PNG.
    #[arg(long, value_name = "FORMAT")]
    pub image_format: Option<ImageFormatArg>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show build and protocol details.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `5s` or a bare number of seconds; zero is rejected.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

fn parse_rgba(input: &str) -> CliResult<[u8; 4]> {
    let digits = input.trim().trim_start_matches('#');
    let mut rgba = [0u8; 4];
    hex::decode_to_slice(digits, &mut rgba).map_err(|_| {
        CliError::new(USAGE, format!("--background must be RRGGBBAA hex, got {input:?}"))
    })?;
    Ok(rgba)
}

fn triple(flag: &str, values: &[i32]) -> CliResult<[i32; 3]> {
    <[i32; 3]>::try_from(values).map_err(|_| {
        CliError::new(
            USAGE,
            format!("{flag} takes exactly three values, got {}", values.len()),
        )
    })
}
