//! The meter's HID report envelope.
//!
//! Both directions carry a 4-byte header whose last byte is the payload
//! length. Inbound reports start with an ASCII tag the meter chooses;
//! outbound ones are zero-filled.

use glucotux_transport::REPORT_LEN;

use crate::error::{FrameError, Result};

/// Header bytes preceding the payload of every report.
pub const REPORT_HEADER_LEN: usize = 4;

/// Largest message that fits into one output report.
pub const MAX_MESSAGE_LEN: usize = REPORT_LEN - REPORT_HEADER_LEN - 1;

/// Build the output report values for `message`.
pub fn encode_report(message: &[u8]) -> Result<Vec<u8>> {
    if message.len() > MAX_MESSAGE_LEN {
        return Err(FrameError::ReportTooLarge {
            len: message.len(),
            max: MAX_MESSAGE_LEN,
        });
    }

    let mut values = Vec::with_capacity(REPORT_HEADER_LEN + message.len());
    values.extend_from_slice(&[0, 0, 0, message.len() as u8]);
    values.extend_from_slice(message);
    Ok(values)
}

/// The payload of an inbound report, with the header stripped.
///
/// The length byte is clamped to what the report actually holds.
pub fn report_payload(report: &[u8]) -> &[u8] {
    if report.len() <= REPORT_HEADER_LEN {
        return &[];
    }
    let body = &report[REPORT_HEADER_LEN..];
    let len = usize::from(report[REPORT_HEADER_LEN - 1]).min(body.len());
    &body[..len]
}
