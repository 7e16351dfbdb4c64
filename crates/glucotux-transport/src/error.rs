use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur in HID transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No node matched the known vendor and product codes.
    ///
    /// `skipped` counts nodes that exist but could not be opened.
    #[error("no supported meter found ({scanned} hid nodes scanned, {skipped} not accessible)")]
    NoDeviceFound { scanned: usize, skipped: usize },

    /// A node could not be opened or its identity could not be queried.
    #[error("cannot access {path}: {source}")]
    DeviceAccess {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No meter was attached within the polling window.
    #[error("no meter attached after {attempts} polls ({waited:?})")]
    AttachmentTimeout { attempts: u32, waited: Duration },

    /// A meter was already attached when polling started.
    #[error("meter at {path} was attached before polling started")]
    AlreadyAttached { path: PathBuf },

    /// Reading an input report failed.
    #[error("reading from device failed: {0}")]
    Read(std::io::Error),

    /// Writing the output report failed.
    #[error("writing to device failed: {0}")]
    Write(std::io::Error),

    /// The caller's buffer cannot hold one report batch.
    #[error("buffer too small ({len} bytes, min {min})")]
    BufferTooSmall { len: usize, min: usize },

    /// The handle was already closed.
    #[error("device handle closed")]
    Closed,

    /// Polling was interrupted through the cancellation flag.
    #[error("cancelled")]
    Cancelled,

    /// Any other I/O error.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
