use crate::cmd::ReadArgs;
use crate::exit::CliResult;
use crate::output::OutputFormat;

#[cfg(target_os = "linux")]
pub fn run(args: ReadArgs, format: OutputFormat) -> CliResult<i32> {
    use std::io::{self, Write};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use glucotux_session::{LogFile, ResultRecord, Session, SessionConfig};
    use glucotux_transport::HiddevBus;

    use crate::exit::{io_error, session_error, CliError, INTERNAL, SUCCESS};
    use crate::output::print_readout;

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;

    // Created only once the meter is ready, so failed runs keep an old log.
    let log = LogFile::new(args.output.unwrap_or_default());

    let config = SessionConfig {
        verbose: args.verbose,
        debug: args.debug,
        ..SessionConfig::default()
    };

    // Machine-readable formats keep stdout for the records.
    let mut console: Box<dyn Write> = match format {
        OutputFormat::Text => Box::new(io::stdout()),
        OutputFormat::Json | OutputFormat::Table => Box::new(io::stderr()),
    };
    writeln!(
        console,
        "attach the meter now (waiting up to {} seconds)",
        config.attach.window().as_secs()
    )
    .map_err(|err| io_error("console", err))?;

    let records: Vec<ResultRecord> = Vec::new();
    let mut session = Session::with_console(config, (log, records), console).with_cancel(cancel);
    let mut bus = HiddevBus::with_prefix(args.nodes);
    let report = session
        .read_from(&mut bus)
        .map_err(|err| session_error("readout failed", err))?;

    let ((log, records), _) = session.into_parts();
    print_readout(&report, &records, log.path(), format);
    Ok(SUCCESS)
}

#[cfg(not(target_os = "linux"))]
pub fn run(_args: ReadArgs, _format: OutputFormat) -> CliResult<i32> {
    Err(crate::cmd::unsupported_platform())
}
