use bytes::{BufMut, Bytes, BytesMut};

use crate::control::{CR, ETB, ETX, LF, STX};
use crate::error::{FrameError, Result};

/// Largest frame the meter sends, trailer included.
pub const MAX_FRAME_LEN: usize = 1024;

/// STX must appear within this many leading bytes.
pub const MAX_START_OFFSET: usize = 4;

/// A checksum-verified ASTM frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw sequence byte (an ASCII digit on the wire).
    pub sequence: u8,
    /// Record text starting at the record-type tag, without the record's
    /// trailing CR.
    pub record: Bytes,
    /// ETB for intermediate frames, ETX for the last frame of a message.
    pub terminator: u8,
    /// Checksum carried by the trailer.
    pub checksum: u8,
}

impl Frame {
    /// Frame number modulo 8.
    pub fn sequence_number(&self) -> u8 {
        self.sequence & 0x07
    }

    /// The record-type tag (`H`, `P`, `O`, `R`, `L`, ...).
    pub fn record_type(&self) -> u8 {
        self.record.first().copied().unwrap_or(0)
    }

    /// Whether this frame ends the message (ETX rather than ETB).
    pub fn is_final(&self) -> bool {
        self.terminator == ETX
    }
}

/// 8-bit sum used by the frame trailer.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte))
}

/// Locate STX and the ETB/ETX terminator.
fn locate(raw: &[u8]) -> Result<(usize, usize)> {
    let start = raw
        .iter()
        .take(MAX_START_OFFSET)
        .position(|&byte| byte == STX)
        .ok_or(FrameError::MissingStart)?;

    let terminator = raw[start + 1..]
        .iter()
        .take(MAX_FRAME_LEN)
        .position(|&byte| byte == ETB || byte == ETX)
        .map(|offset| start + 1 + offset)
        .ok_or(FrameError::MissingTerminator)?;

    Ok((start, terminator))
}

fn hex_digit(byte: u8) -> Option<u8> {
    char::from(byte).to_digit(16).map(|digit| digit as u8)
}

fn trailer(raw: &[u8], terminator: usize) -> Result<u8> {
    match raw.get(terminator + 1..terminator + 3) {
        Some(&[high, low]) => match (hex_digit(high), hex_digit(low)) {
            (Some(high), Some(low)) => Ok((high << 4) | low),
            _ => Err(FrameError::InvalidChecksumDigits),
        },
        _ => Err(FrameError::InvalidChecksumDigits),
    }
}

fn check(raw: &[u8]) -> Result<(usize, usize, u8)> {
    let (start, terminator) = locate(raw)?;
    let computed = checksum(&raw[start + 1..=terminator]);
    let expected = trailer(raw, terminator)?;
    if computed != expected {
        return Err(FrameError::Checksum { expected, computed });
    }
    Ok((start, terminator, expected))
}

/// Verify the checksum trailer of a raw frame.
pub fn verify_checksum(raw: &[u8]) -> Result<()> {
    check(raw).map(|_| ())
}

/// Verify and decode a raw frame as accumulated from the link.
pub fn decode_frame(raw: &[u8]) -> Result<Frame> {
    let (start, terminator, checksum) = check(raw)?;

    let body = &raw[start + 1..terminator];
    let (&sequence, record) = body.split_first().ok_or(FrameError::MissingRecordType)?;
    if record.is_empty() {
        return Err(FrameError::MissingRecordType);
    }
    let record = record.strip_suffix(&[CR]).unwrap_or(record);

    Ok(Frame {
        sequence,
        record: Bytes::copy_from_slice(record),
        terminator: raw[terminator],
        checksum,
    })
}

/// Encode one record into a complete frame.
///
/// `record` starts with the record-type tag; the record CR, terminator,
/// checksum trailer and CR LF are appended here. Only the low 3 bits of
/// `sequence` are used.
pub fn encode_frame(sequence: u8, record: &[u8], last: bool, dst: &mut BytesMut) {
    let terminator = if last { ETX } else { ETB };
    let start = dst.len();

    dst.reserve(record.len() + 8);
    dst.put_u8(STX);
    dst.put_u8(b'0' + (sequence & 0x07));
    dst.put_slice(record);
    dst.put_u8(CR);
    dst.put_u8(terminator);

    let sum = checksum(&dst[start + 1..]);
    dst.put_slice(format!("{sum:02X}").as_bytes());
    dst.put_u8(CR);
    dst.put_u8(LF);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_known_frames() {
        verify_checksum(b"\x025L|1|N\r\x0308\r\n").unwrap();
        verify_checksum(b"\x021H|\\^&\r\x17F9\r\n").unwrap();
        verify_checksum(b"\x022R|1|^^^Glucose|93|mg/dL^P||A/M0/T1||201909221314\r\x1775\r\n")
            .unwrap();
    }

    #[test]
    fn lowercase_trailer_accepted() {
        verify_checksum(b"\x021H|\\^&\r\x17f9\r\n").unwrap();
    }

    #[test]
    fn checksum_mismatch() {
        let err = verify_checksum(b"\x025L|1|N\r\x0309\r\n").unwrap_err();
        assert!(matches!(
            err,
            FrameError::Checksum {
                expected: 0x09,
                computed: 0x08
            }
        ));
    }

    #[test]
    fn start_marker_scan_is_bounded() {
        verify_checksum(b"ABC\x025L|1|N\r\x0308\r\n").unwrap();
        let err = verify_checksum(b"ABCD\x025L|1|N\r\x0308\r\n").unwrap_err();
        assert!(matches!(err, FrameError::MissingStart));
    }

    #[test]
    fn missing_terminator() {
        let err = verify_checksum(b"\x025L|1|N\r\n").unwrap_err();
        assert!(matches!(err, FrameError::MissingTerminator));
    }

    #[test]
    fn truncated_trailer() {
        let err = verify_checksum(b"\x025L|1|N\r\x030").unwrap_err();
        assert!(matches!(err, FrameError::InvalidChecksumDigits));
        let err = verify_checksum(b"\x025L|1|N\r\x03zz\r\n").unwrap_err();
        assert!(matches!(err, FrameError::InvalidChecksumDigits));
    }

    #[test]
    fn decode_splits_header_parts() {
        let frame = decode_frame(b"\x025L|1|N\r\x0308\r\n").unwrap();
        assert_eq!(frame.sequence, b'5');
        assert_eq!(frame.sequence_number(), 5);
        assert_eq!(frame.record_type(), b'L');
        assert_eq!(frame.record.as_ref(), b"L|1|N");
        assert!(frame.is_final());
        assert_eq!(frame.checksum, 0x08);
    }

    #[test]
    fn decode_rejects_empty_frame() {
        let mut buf = BytesMut::new();
        buf.put_u8(STX);
        buf.put_u8(b'1');
        buf.put_u8(ETX);
        let sum = checksum(&buf[1..]);
        buf.put_slice(format!("{sum:02X}\r\n").as_bytes());

        let err = decode_frame(&buf).unwrap_err();
        assert!(matches!(err, FrameError::MissingRecordType));
    }

    #[test]
    fn encoded_frames_verify() {
        let mut buf = BytesMut::new();
        encode_frame(2, b"R|1|^^^Glucose|93|mg/dL^P||A/M0/T1||201909221314", false, &mut buf);
        assert_eq!(
            buf.as_ref(),
            b"\x022R|1|^^^Glucose|93|mg/dL^P||A/M0/T1||201909221314\r\x1775\r\n"
        );

        let frame = decode_frame(&buf).unwrap();
        assert!(!frame.is_final());
        assert_eq!(frame.record_type(), b'R');
    }

    #[test]
    fn sequence_wraps_at_eight() {
        let mut buf = BytesMut::new();
        encode_frame(8, b"L|1|N", true, &mut buf);
        assert_eq!(decode_frame(&buf).unwrap().sequence_number(), 0);
    }

    #[test]
    fn checksum_sums_modulo_256() {
        assert_eq!(checksum(&[0xff, 0x02]), 0x01);
        assert_eq!(checksum(&[]), 0);
    }
}
