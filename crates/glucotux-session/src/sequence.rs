use crate::error::{Result, SessionError};

/// Expected frame number, cycling 1..7, 0, 1, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceCounter {
    expected: u8,
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self { expected: 1 }
    }

    pub fn expected(&self) -> u8 {
        self.expected
    }

    /// Accept `sequence` (only its low 3 bits count) and advance.
    ///
    /// A mismatch leaves the counter where it was.
    pub fn accept(&mut self, sequence: u8) -> Result<()> {
        let received = sequence & 0x07;
        if received != self.expected {
            return Err(SessionError::Sequence {
                expected: self.expected,
                received,
            });
        }
        self.expected = (self.expected + 1) & 0x07;
        Ok(())
    }
}
