//! ASCII control bytes used by the ASTM link layer.

/// Start of text (frame start).
pub const STX: u8 = 0x02;
/// End of text (last frame of a message).
pub const ETX: u8 = 0x03;
/// End of transmission.
pub const EOT: u8 = 0x04;
/// Enquiry (meter is ready to send).
pub const ENQ: u8 = 0x05;
/// Positive acknowledgement.
pub const ACK: u8 = 0x06;
pub const LF: u8 = 0x0a;
pub const CR: u8 = 0x0d;
/// Negative acknowledgement.
pub const NAK: u8 = 0x15;
/// End of transmission block (intermediate frame).
pub const ETB: u8 = 0x17;

/// Returns the mnemonic for a control byte.
pub fn control_name(byte: u8) -> Option<&'static str> {
    match byte {
        STX => Some("STX"),
        ETX => Some("ETX"),
        EOT => Some("EOT"),
        ENQ => Some("ENQ"),
        ACK => Some("ACK"),
        LF => Some("LF"),
        CR => Some("CR"),
        NAK => Some("NAK"),
        ETB => Some("ETB"),
        _ => None,
    }
}

/// Render a raw buffer for logs: printable ASCII as is, control bytes as
/// `<STX>`-style mnemonics and anything else as `<0x..>`.
pub fn escape(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &byte in bytes {
        if let Some(name) = control_name(byte) {
            out.push('<');
            out.push_str(name);
            out.push('>');
        } else if byte.is_ascii_graphic() || byte == b' ' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("<{byte:#04x}>"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_spells_out_control_bytes() {
        assert_eq!(escape(b"\x021H|\r\x17"), "<STX>1H|<CR><ETB>");
        assert_eq!(escape(&[0x00, 0xff]), "<0x00><0xff>");
        assert_eq!(escape(b"a b"), "a b");
    }
}
