use glucotux_transport::TransportError;

/// Errors that can occur while assembling or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// No STX within the first bytes of the frame.
    #[error("frame start marker missing")]
    MissingStart,

    /// No ETB/ETX after the start marker.
    #[error("frame terminator missing")]
    MissingTerminator,

    /// The accumulated frame grew past the maximum frame size.
    #[error("frame too long ({len} bytes, max {max})")]
    FrameTooLong { len: usize, max: usize },

    /// Too many consecutive part reads delivered no payload.
    #[error("frame stalled ({reads} consecutive empty reads)")]
    Stalled { reads: u32 },

    /// The checksum trailer doesn't match the frame contents.
    #[error("checksum mismatch (frame says {expected:#04x}, computed {computed:#04x})")]
    Checksum { expected: u8, computed: u8 },

    /// The checksum trailer is not two hexadecimal digits.
    #[error("checksum trailer is not two hex digits")]
    InvalidChecksumDigits,

    /// The frame carries no sequence number or record type.
    #[error("frame has no record type")]
    MissingRecordType,

    /// An outbound message doesn't fit into one output report.
    #[error("message too large for one report ({len} bytes, max {max})")]
    ReportTooLarge { len: usize, max: usize },

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl FrameError {
    /// Whether the error describes a malformed frame, as opposed to I/O.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            FrameError::MissingStart
                | FrameError::MissingTerminator
                | FrameError::FrameTooLong { .. }
                | FrameError::Stalled { .. }
                | FrameError::InvalidChecksumDigits
                | FrameError::MissingRecordType
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
