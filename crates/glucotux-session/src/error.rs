use std::path::PathBuf;

/// Errors that end a readout session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] glucotux_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] glucotux_frame::FrameError),

    /// A frame arrived out of order.
    #[error("frame sequence error (expected {expected}, received {received})")]
    Sequence { expected: u8, received: u8 },

    /// The terminator record reported an abnormal end.
    #[error("message terminated with code {code:?}")]
    MessageTerminator { code: String },

    /// A record could not be decoded.
    #[error("malformed record: {0}")]
    RecordFormat(String),

    /// Writing the log file or console failed.
    #[error("cannot write {path}: {source}")]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The session was interrupted through the cancellation flag.
    #[error("cancelled")]
    Cancelled,
}

impl SessionError {
    /// Whether the meter was plugged in too early and has to be reattached.
    pub fn needs_reattach(&self) -> bool {
        matches!(
            self,
            SessionError::Transport(glucotux_transport::TransportError::AlreadyAttached { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
