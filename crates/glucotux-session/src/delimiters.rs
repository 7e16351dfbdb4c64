use crate::error::{Result, SessionError};

/// Separators announced by the header record.
///
/// Before a header arrives only the field delimiter is known (`|`). The
/// header's four bytes after the `H` tag replace all four for the rest of the
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimiterSet {
    pub field: u8,
    pub repeat: Option<u8>,
    pub component: Option<u8>,
    pub escape: Option<u8>,
}

impl Default for DelimiterSet {
    fn default() -> Self {
        Self {
            field: b'|',
            repeat: None,
            component: None,
            escape: None,
        }
    }
}

impl DelimiterSet {
    /// Read the announcement from a header record (starting at the `H` tag).
    pub fn from_header(record: &[u8]) -> Result<Self> {
        match record {
            [b'H', field, repeat, component, escape, ..] => Ok(Self {
                field: *field,
                repeat: announced(*repeat),
                component: announced(*component),
                escape: announced(*escape),
            }),
            _ => Err(SessionError::RecordFormat(
                "header record too short for delimiter announcement".to_string(),
            )),
        }
    }

    /// The four announcement bytes as they appear after the `H` tag.
    ///
    /// Unset delimiters are written as NUL.
    pub fn announcement(&self) -> [u8; 4] {
        [
            self.field,
            self.repeat.unwrap_or(0),
            self.component.unwrap_or(0),
            self.escape.unwrap_or(0),
        ]
    }
}

fn announced(byte: u8) -> Option<u8> {
    (byte != 0).then_some(byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_pipe_only() {
        let set = DelimiterSet::default();
        assert_eq!(set.field, b'|');
        assert_eq!(set.component, None);
    }

    #[test]
    fn reads_header_announcement() {
        let set = DelimiterSet::from_header(b"H|\\^&||qvqOi8|Bayer7390").unwrap();
        assert_eq!(set.field, b'|');
        assert_eq!(set.repeat, Some(b'\\'));
        assert_eq!(set.component, Some(b'^'));
        assert_eq!(set.escape, Some(b'&'));
        assert_eq!(&set.announcement(), b"|\\^&");
    }

    #[test]
    fn short_header_rejected() {
        assert!(matches!(
            DelimiterSet::from_header(b"H|\\"),
            Err(SessionError::RecordFormat(_))
        ));
        assert!(DelimiterSet::from_header(b"R|\\^&").is_err());
    }
}
