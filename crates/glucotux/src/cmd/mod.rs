use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod scan;
pub mod read;
pub mod version;

/// Node prefix used when `--nodes` is not given.
pub const DEFAULT_NODE_PREFIX: &str = "/dev/usb/hiddev";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Wait for a meter to be attached and download its records.
    Read(ReadArgs),
    /// List the hid nodes and whether they are supported meters.
    Scan(ScanArgs),
    /// Show version information.
    Version(VersionArgs),
}

impl Command {
    /// Whether raw frame tracing was requested.
    pub fn debug(&self) -> bool {
        matches!(self, Command::Read(args) if args.debug)
    }
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Read(args) => read::run(args, format),
        Command::Scan(args) => scan::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Log file, replaced once the meter is ready. Screen only if omitted.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Print every record instead of a progress counter.
    #[arg(long, short = 'v')]
    pub verbose: bool,
    /// Trace raw frames (raises the log level to debug).
    #[arg(long, short = 'd')]
    pub debug: bool,
    /// Path prefix of the numbered hiddev nodes.
    #[arg(
        long,
        value_name = "PREFIX",
        env = "GLUCOTUX_HIDDEV_PREFIX",
        default_value = DEFAULT_NODE_PREFIX
    )]
    pub nodes: String,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Path prefix of the numbered hiddev nodes.
    #[arg(
        long,
        value_name = "PREFIX",
        env = "GLUCOTUX_HIDDEV_PREFIX",
        default_value = DEFAULT_NODE_PREFIX
    )]
    pub nodes: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// hiddev is only available on Linux.
#[cfg(not(target_os = "linux"))]
pub fn unsupported_platform() -> crate::exit::CliError {
    crate::exit::CliError::new(
        crate::exit::USAGE,
        format!("hiddev meters are not supported on {}", std::env::consts::OS),
    )
}
