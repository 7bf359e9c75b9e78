use miibridge::wire::encode;

use crate::cmd::EncodeArgs;
use crate::exit::{render_error, CliResult, SUCCESS};
use crate::output::{print_encoded, OutputFormat};

/// Encode a request and print it without connecting.
pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let request = args.request.build()?;
    let version = args.request.protocol;
    let bytes = encode(&request, version).map_err(|err| render_error("encode failed", err.into()))?;
    print_encoded(&version.to_string(), &bytes, format);
    Ok(SUCCESS)
}
