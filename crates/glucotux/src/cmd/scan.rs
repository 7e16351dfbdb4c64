use crate::cmd::ScanArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[cfg(target_os = "linux")]
pub fn run(args: ScanArgs, format: OutputFormat) -> CliResult<i32> {
    use glucotux_transport::{scan, HiddevBus};

    use crate::output::print_scan;

    let mut bus = HiddevBus::with_prefix(args.nodes);
    let nodes = scan(&mut bus);
    print_scan(&nodes, format);
    Ok(SUCCESS)
}

#[cfg(not(target_os = "linux"))]
pub fn run(_args: ScanArgs, _format: OutputFormat) -> CliResult<i32> {
    Err(crate::cmd::unsupported_platform())
}
