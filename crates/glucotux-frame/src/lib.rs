//! ASTM E1394 framing on top of the meter's HID reports.
//!
//! Every frame on the wire looks like:
//!
//! ```text
//! STX <seq> <record type> <fields...> CR <ETB|ETX> <checksum: 2 hex> CR LF
//! ```
//!
//! The checksum is the 8-bit sum of everything between STX (exclusive) and
//! the ETB/ETX terminator (inclusive). Frames arrive split over several
//! 64-byte HID reports; [`AstmLink`] reassembles them, pacing its reads and
//! acknowledgements the way the meter expects.

pub mod codec;
pub mod control;
pub mod error;
pub mod fields;
pub mod link;
pub mod report;

pub use codec::{
    checksum, decode_frame, encode_frame, verify_checksum, Frame, MAX_FRAME_LEN, MAX_START_OFFSET,
};
pub use control::{escape, ACK, CR, ENQ, EOT, ETB, ETX, LF, NAK, STX};
pub use error::{FrameError, Result};
pub use fields::{
    split_fields, FieldTable, MAX_COMPONENTS, MAX_COMPONENT_LEN, MAX_FIELDS, MAX_FIELD_LEN,
};
pub use link::{AstmLink, LinkConfig};
pub use report::{encode_report, report_payload, MAX_MESSAGE_LEN, REPORT_HEADER_LEN};
