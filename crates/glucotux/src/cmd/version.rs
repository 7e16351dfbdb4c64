use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("glucotux {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: glucotux");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("GLUCOTUX_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("hiddev: {}", cfg!(target_os = "linux"));
    println!(
        "meters: {}",
        glucotux_transport::DeviceKind::ALL
            .iter()
            .map(|kind| format!("{kind} ({:04x})", kind.product_id()))
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(SUCCESS)
}
