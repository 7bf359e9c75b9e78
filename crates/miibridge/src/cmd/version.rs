use miibridge::transport::DEFAULT_PORT;
use miibridge::wire::ProtocolVersion;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

/// Print the version banner.
pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("miibridge {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: miibridge");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("MIIBRIDGE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    let protocols = ProtocolVersion::ALL
        .iter()
        .map(|version| format!("{version} ({} B)", version.request_len()))
        .collect::<Vec<_>>()
        .join(", ");
    println!("protocols: {protocols}");
    println!("default_port: {DEFAULT_PORT}");
    println!("unix_sockets: {}", cfg!(unix));

    Ok(SUCCESS)
}
