//! ASTM session protocol for Contour glucose meters.
//!
//! A [`Session`] drives one readout: it waits for the meter's readiness
//! signal, reads frames through an [`AstmLink`](glucotux_frame::AstmLink),
//! checks their sequence numbers, decodes each record and hands every result
//! to a [`RecordSink`]. [`read_meter`] adds the attachment wait on top.

pub mod delimiters;
pub mod error;
pub mod output;
pub mod record;
pub mod sequence;
pub mod session;

pub use delimiters::DelimiterSet;
pub use error::{Result, SessionError};
pub use output::{format_record, LogFile, RecordSink};
pub use record::{
    decode_record, format_meter_time, HeaderRecord, Measurement, Record, RecordType,
    ResultRecord, TerminatorRecord, TestKind,
};
pub use sequence::SequenceCounter;
pub use session::{Session, SessionConfig, SessionReport, SessionState};

#[cfg(target_os = "linux")]
pub use session::read_meter;
