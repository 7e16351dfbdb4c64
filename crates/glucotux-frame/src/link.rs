use std::time::Duration;

use bytes::BytesMut;
use glucotux_transport::{HidTransport, REPORT_LEN};
use tracing::trace;

use crate::codec::MAX_FRAME_LEN;
use crate::control::{escape, ACK, LF};
use crate::error::{FrameError, Result};
use crate::report::{encode_report, report_payload, REPORT_HEADER_LEN};

/// Reports up to this size (header included) carry the readiness status.
const STATUS_REPORT_MAX_LEN: usize = 36;

/// Timing and size limits of the link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Delay before every outbound message. Default: 30 ms.
    pub write_delay: Duration,
    /// Extra delay before every `read_pause_every`-th frame read. Default: 20 ms.
    pub read_pause: Duration,
    /// Default: 16. Zero disables the pause.
    pub read_pause_every: u64,
    /// Maximum accumulated frame length. Default: 1024.
    pub max_frame_len: usize,
    /// Consecutive empty part reads that abort a frame. Default: 64.
    pub max_empty_reads: u32,
    /// Applies every delay. Default: [`std::thread::sleep`].
    pub sleep: fn(Duration),
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            write_delay: Duration::from_millis(30),
            read_pause: Duration::from_millis(20),
            read_pause_every: 16,
            max_frame_len: MAX_FRAME_LEN,
            max_empty_reads: 64,
            sleep: std::thread::sleep,
        }
    }
}

impl LinkConfig {
    /// No delays at all, for scripted devices.
    pub fn unpaced() -> Self {
        Self {
            write_delay: Duration::ZERO,
            read_pause: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Paced message exchange with the meter over a [`HidTransport`].
///
/// Every frame read is a series of raw report reads, each preceded by an
/// acknowledgement, until the accumulated payload ends in LF.
pub struct AstmLink<T> {
    inner: T,
    config: LinkConfig,
    part_reads: u64,
    report: [u8; REPORT_LEN],
}

impl<T: HidTransport> AstmLink<T> {
    /// Create a link with default pacing.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, LinkConfig::default())
    }

    pub fn with_config(inner: T, config: LinkConfig) -> Self {
        Self {
            inner,
            config,
            part_reads: 0,
            report: [0; REPORT_LEN],
        }
    }

    /// Send one message (at most one report's worth).
    pub fn send(&mut self, message: &[u8]) -> Result<()> {
        let values = encode_report(message)?;
        (self.config.sleep)(self.config.write_delay);
        trace!(message = %escape(message), "send");
        self.inner.write_report(&values)?;
        Ok(())
    }

    /// Send a single control byte such as ACK or NAK.
    pub fn send_control(&mut self, byte: u8) -> Result<()> {
        self.send(&[byte])
    }

    fn read_raw(&mut self) -> Result<&[u8]> {
        let count = self.inner.read_report(&mut self.report)?;
        let report = &self.report[..count.min(REPORT_LEN)];
        trace!(len = count, report = %escape(report), "raw read");
        Ok(report)
    }

    /// Read the readiness status byte.
    ///
    /// Longer reports are skipped until a short one arrives; its last payload
    /// byte is the status. Returns `None` if no short report shows up within
    /// `max_reads` reads or it has no payload.
    pub fn read_status(&mut self, max_reads: usize) -> Result<Option<u8>> {
        for _ in 0..max_reads {
            let payload = report_payload(self.read_raw()?);
            if REPORT_HEADER_LEN + payload.len() <= STATUS_REPORT_MAX_LEN {
                return Ok(payload.last().copied());
            }
        }
        Ok(None)
    }

    /// Read one complete frame.
    ///
    /// `reply` is sent before the first part read (ACK normally, NAK to ask
    /// for a retransmission); later parts are preceded by ACK. Fails with
    /// [`FrameError::Stalled`] once `max_empty_reads` reads in a row carry no
    /// payload.
    pub fn read_frame(&mut self, reply: u8) -> Result<BytesMut> {
        let max = self.config.max_frame_len;
        let mut frame = BytesMut::with_capacity(max);
        let mut reply = reply;
        let mut empty_reads = 0;

        loop {
            self.part_reads += 1;
            if self.config.read_pause_every > 0
                && self.part_reads % self.config.read_pause_every == 0
            {
                (self.config.sleep)(self.config.read_pause);
            }

            self.send_control(reply)?;
            reply = ACK;

            let payload = report_payload(self.read_raw()?);
            if payload.is_empty() {
                empty_reads += 1;
                if empty_reads >= self.config.max_empty_reads {
                    return Err(FrameError::Stalled { reads: empty_reads });
                }
                continue;
            }
            empty_reads = 0;

            if frame.len() + payload.len() > max {
                return Err(FrameError::FrameTooLong {
                    len: frame.len() + payload.len(),
                    max,
                });
            }
            frame.extend_from_slice(payload);

            if frame.last() == Some(&LF) {
                return Ok(frame);
            }
        }
    }

    /// Number of part reads issued by [`read_frame`](Self::read_frame).
    pub fn part_reads(&self) -> u64 {
        self.part_reads
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the link and return the transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
