use std::fmt;
use std::io;

use glucotux_frame::FrameError;
use glucotux_session::SessionError;
use glucotux_transport::TransportError;

// Exit codes follow sysexits where one fits.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
#[allow(dead_code)]
pub const USAGE: i32 = 64;
pub const DEVICE_NOT_READY: i32 = 69;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::DeviceAccess { ref source, .. }
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            CliError::new(
                PERMISSION_DENIED,
                format!("{context}: {err}\nthe hiddev nodes must be readable and writable"),
            )
        }
        TransportError::DeviceAccess { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        TransportError::AlreadyAttached { .. } => CliError::new(
            DEVICE_NOT_READY,
            format!(
                "{context}: {err}\n\
                 the meter can only be read right after it is attached:\n\
                 remove the meter and wait some seconds,\n\
                 then FIRST start glucotux and SECOND attach the meter"
            ),
        ),
        TransportError::AttachmentTimeout { waited, .. } => CliError::new(
            TIMEOUT,
            format!(
                "{context}: {err}\nattach the meter within {} seconds after starting glucotux",
                waited.as_secs()
            ),
        ),
        TransportError::NoDeviceFound { .. } => {
            CliError::new(DEVICE_NOT_READY, format!("{context}: {err}"))
        }
        TransportError::Read(source)
        | TransportError::Write(source)
        | TransportError::Io(source) => match source.kind() {
            io::ErrorKind::PermissionDenied => io_error(context, source),
            _ => CliError::new(TRANSPORT_ERROR, format!("{context}: {source}")),
        },
        TransportError::Cancelled => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::ReportTooLarge { .. } => CliError::new(INTERNAL, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::Frame(err) => frame_error(context, err),
        SessionError::Output { path, source } => {
            io_error(&format!("{context}: {}", path.display()), source)
        }
        SessionError::Cancelled => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}
