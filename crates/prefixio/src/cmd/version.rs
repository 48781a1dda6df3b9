use prefixio_frame::{MAX_LEN, PREFIX_LEN};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("prefixio {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: prefixio");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("PREFIXIO_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("wire: u64 big-endian length prefix ({PREFIX_LEN} bytes), max payload {MAX_LEN} bytes");
    println!("features: async={}, cli=true", cfg!(feature = "async"));

    Ok(SUCCESS)
}
