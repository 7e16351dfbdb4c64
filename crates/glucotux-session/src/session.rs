use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use glucotux_frame::{decode_frame, escape, AstmLink, FrameError, LinkConfig, ACK, ENQ, NAK};
use glucotux_transport::{
    await_attachment, AttachConfig, DeviceHandle, DeviceKind, HidBus, HidTransport,
    TransportError,
};
use tracing::{debug, info, trace, warn};

use crate::delimiters::DelimiterSet;
use crate::error::{Result, SessionError};
use crate::output::{format_record, RecordSink};
use crate::record::{decode_record, HeaderRecord, Record};
use crate::sequence::SequenceCounter;

const CONSOLE: &str = "<console>";

/// Configuration for one readout.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Print every decoded result line instead of a progress counter.
    pub verbose: bool,
    /// Log every raw frame at debug level.
    pub debug: bool,
    pub link: LinkConfig,
    pub attach: AttachConfig,
    /// Wait before the transfer on meters without a readiness signal.
    /// Default: 5 s.
    pub settle_delay: Duration,
    /// Retransmissions requested for one frame before a checksum mismatch
    /// ends the session. Default: 1.
    pub checksum_retries: u32,
    /// Reads allowed while looking for the readiness status. Default: 256.
    pub max_status_reads: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            debug: false,
            link: LinkConfig::default(),
            attach: AttachConfig::default(),
            settle_delay: Duration::from_secs(5),
            checksum_retries: 1,
            max_status_reads: 256,
        }
    }
}

/// Where a session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingDevice,
    Handshaking,
    TransferLoop,
    Draining,
    Closed,
}

/// Outcome of a completed readout.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub kind: DeviceKind,
    /// False if the meter announced that it has nothing to send.
    pub ready: bool,
    pub header: Option<HeaderRecord>,
    /// Frames accepted, header and terminator included.
    pub frames: usize,
    /// Result records handed to the sink.
    pub results: usize,
    /// Frames the meter was asked to send again.
    pub retransmissions: usize,
}

impl SessionReport {
    fn new(kind: DeviceKind) -> Self {
        Self {
            kind,
            ready: false,
            header: None,
            frames: 0,
            results: 0,
            retransmissions: 0,
        }
    }
}

/// One meter readout.
///
/// Results go to the sink `S`; progress and verbose lines go to the console
/// `W`. The cancellation flag is checked while waiting for the meter and
/// before every frame.
pub struct Session<S, W = io::Stdout> {
    config: SessionConfig,
    sink: S,
    console: W,
    cancel: Arc<AtomicBool>,
    state: SessionState,
}

impl<S: RecordSink> Session<S, io::Stdout> {
    /// Create a session printing to stdout.
    pub fn new(config: SessionConfig, sink: S) -> Self {
        Self::with_console(config, sink, io::stdout())
    }
}

impl<S: RecordSink, W: Write> Session<S, W> {
    pub fn with_console(config: SessionConfig, sink: S, console: W) -> Self {
        Self {
            config,
            sink,
            console,
            cancel: Arc::new(AtomicBool::new(false)),
            state: SessionState::Idle,
        }
    }

    /// Share an externally owned cancellation flag.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn console(&self) -> &W {
        &self.console
    }

    /// Consume the session and return the sink and console.
    pub fn into_parts(self) -> (S, W) {
        (self.sink, self.console)
    }

    /// Wait for a meter on `bus` and read it out.
    pub fn read_from<B: HidBus>(&mut self, bus: &mut B) -> Result<SessionReport> {
        self.enter(SessionState::AwaitingDevice);
        let (handle, kind) = match await_attachment(bus, &self.config.attach, &self.cancel) {
            Ok(found) => found,
            Err(err) => {
                self.enter(SessionState::Closed);
                return Err(match err {
                    TransportError::Cancelled => SessionError::Cancelled,
                    other => other.into(),
                });
            }
        };
        info!(path = ?handle.path(), %kind, "meter attached");
        self.run(handle, kind)
    }

    /// Read out an already discovered meter and close its handle.
    pub fn run<N: HidTransport>(
        &mut self,
        mut handle: DeviceHandle<N>,
        kind: DeviceKind,
    ) -> Result<SessionReport> {
        let result = self.run_transport(&mut handle, kind);
        handle.close();
        result
    }

    /// Read out a meter over any transport.
    ///
    /// The session ends in [`SessionState::Closed`] whatever the outcome.
    /// The transport itself stays with the caller.
    pub fn run_transport<T: HidTransport>(
        &mut self,
        transport: &mut T,
        kind: DeviceKind,
    ) -> Result<SessionReport> {
        let result = self.transfer(transport, kind);
        if let Err(err) = &result {
            debug!(error = %err, state = ?self.state, "session failed");
        }
        self.enter(SessionState::Closed);
        result
    }

    fn enter(&mut self, state: SessionState) {
        trace!(from = ?self.state, to = ?state, "session state");
        self.state = state;
    }

    fn check_cancel(&self) -> Result<()> {
        if self.cancel.load(Ordering::SeqCst) {
            return Err(SessionError::Cancelled);
        }
        Ok(())
    }

    fn transfer<T: HidTransport>(
        &mut self,
        transport: &mut T,
        kind: DeviceKind,
    ) -> Result<SessionReport> {
        let mut link = AstmLink::with_config(transport, self.config.link.clone());
        let mut report = SessionReport::new(kind);

        self.enter(SessionState::Handshaking);
        self.check_cancel()?;
        if kind.signals_ready() {
            let status = link.read_status(self.config.max_status_reads)?;
            if status != Some(ENQ) {
                info!(status = ?status.map(|byte| escape(&[byte])), "meter has no data to send");
                self.enter(SessionState::Draining);
                self.sink.finish()?;
                return Ok(report);
            }
        } else {
            debug!(delay = ?self.config.settle_delay, "waiting for meter to settle");
            std::thread::sleep(self.config.settle_delay);
        }
        report.ready = true;

        self.enter(SessionState::TransferLoop);
        self.sink.begin()?;
        self.frame_loop(&mut link, &mut report)?;

        self.enter(SessionState::Draining);
        link.send_control(NAK)?;
        self.sink.finish()?;
        self.console_write(format_args!("\n"))?;
        info!(
            results = report.results,
            frames = report.frames,
            retransmissions = report.retransmissions,
            "transfer complete"
        );
        Ok(report)
    }

    fn frame_loop<T: HidTransport>(
        &mut self,
        link: &mut AstmLink<T>,
        report: &mut SessionReport,
    ) -> Result<()> {
        let mut delimiters = DelimiterSet::default();
        let mut sequence = SequenceCounter::new();
        let mut reply = ACK;
        let mut bad_checksums = 0;

        loop {
            self.check_cancel()?;

            let raw = link.read_frame(reply).map_err(|err| reject(link, err))?;
            if self.config.debug {
                debug!(len = raw.len(), frame = %escape(&raw), "frame");
            }

            let frame = match decode_frame(&raw) {
                Ok(frame) => frame,
                Err(FrameError::Checksum { expected, computed })
                    if bad_checksums < self.config.checksum_retries =>
                {
                    bad_checksums += 1;
                    report.retransmissions += 1;
                    warn!(expected, computed, "checksum mismatch, asking for resend");
                    reply = NAK;
                    continue;
                }
                Err(err) => return Err(reject(link, err)),
            };
            bad_checksums = 0;
            reply = ACK;

            if let Err(err) = sequence.accept(frame.sequence) {
                nak(link);
                return Err(err);
            }
            report.frames += 1;
            trace!(
                seq = frame.sequence_number(),
                tag = %char::from(frame.record_type()),
                "frame accepted"
            );

            self.dispatch(&frame.record, &mut delimiters, report)?;

            if frame.is_final() {
                return Ok(());
            }
        }
    }

    fn dispatch(
        &mut self,
        record: &[u8],
        delimiters: &mut DelimiterSet,
        report: &mut SessionReport,
    ) -> Result<()> {
        match decode_record(record, delimiters, report.kind.timestamp_width())? {
            Record::Header(header) => {
                *delimiters = header.delimiters;
                let time = header.time_display().unwrap_or_default();
                debug!(
                    product = %header.product,
                    software = %header.software,
                    serial = %header.serial,
                    records = ?header.record_count,
                    time = %time,
                    "header"
                );
                if self.config.verbose {
                    self.console_write(format_args!(
                        "{} {} {}\n",
                        header.product, header.software, time
                    ))?;
                }
                report.header = Some(header);
            }
            Record::Result(result) => {
                self.sink.emit(&result)?;
                report.results += 1;
                if self.config.verbose {
                    self.console_write(format_args!(" {}\n", format_record(&result)))?;
                } else {
                    self.console_write(format_args!("\r{:4}", result.number))?;
                }
            }
            Record::Terminator(end) => {
                if !end.is_normal() {
                    return Err(SessionError::MessageTerminator { code: end.code });
                }
            }
            Record::Patient | Record::Order => {}
            Record::Unknown(tag) => debug!(tag = %char::from(tag), "unknown record type ignored"),
        }
        Ok(())
    }

    fn console_write(&mut self, args: std::fmt::Arguments<'_>) -> Result<()> {
        self.console
            .write_fmt(args)
            .and_then(|()| self.console.flush())
            .map_err(|source| SessionError::Output {
                path: CONSOLE.into(),
                source,
            })
    }
}

fn nak<T: HidTransport>(link: &mut AstmLink<T>) {
    if let Err(err) = link.send_control(NAK) {
        debug!(error = %err, "NAK not delivered");
    }
}

/// Map a frame error to a session error, NAKing malformed frames first.
fn reject<T: HidTransport>(link: &mut AstmLink<T>, err: FrameError) -> SessionError {
    if err.is_structural() || matches!(err, FrameError::Checksum { .. }) {
        nak(link);
    }
    err.into()
}

/// Wait for a meter on the default hiddev nodes and read it out.
#[cfg(target_os = "linux")]
pub fn read_meter<S: RecordSink>(
    config: SessionConfig,
    sink: S,
    cancel: Arc<AtomicBool>,
) -> Result<SessionReport> {
    let mut bus = glucotux_transport::HiddevBus::default();
    Session::new(config, sink)
        .with_cancel(cancel)
        .read_from(&mut bus)
}
