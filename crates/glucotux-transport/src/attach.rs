use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, trace};

use crate::discovery::{discover, DeviceHandle};
use crate::error::{Result, TransportError};
use crate::traits::{DeviceKind, HidBus};

/// Polling parameters used while waiting for a meter to be plugged in.
#[derive(Debug, Clone)]
pub struct AttachConfig {
    /// Delay between two discovery passes. Default: 500 ms.
    pub poll_interval: Duration,
    /// Number of passes after the initial one. Default: 60 (about 30 s).
    pub max_attempts: u32,
}

impl Default for AttachConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_attempts: 60,
        }
    }
}

impl AttachConfig {
    /// Total time covered by the polling window.
    pub fn window(&self) -> Duration {
        self.poll_interval * self.max_attempts
    }
}

/// Wait until a meter is attached.
///
/// A meter can only be read once per attachment, so the meter has to show up
/// after polling begins. If one is already present on the first pass this
/// returns [`TransportError::AlreadyAttached`] and the handle is closed again.
pub fn await_attachment<B: HidBus>(
    bus: &mut B,
    config: &AttachConfig,
    cancel: &AtomicBool,
) -> Result<(DeviceHandle<B::Node>, DeviceKind)> {
    match discover(bus) {
        Ok((handle, kind)) => {
            debug!(path = ?handle.path(), %kind, "meter present before polling started");
            return Err(TransportError::AlreadyAttached {
                path: handle.path().to_path_buf(),
            });
        }
        Err(TransportError::NoDeviceFound { .. }) => {}
        Err(err) => return Err(err),
    }

    for attempt in 1..=config.max_attempts {
        if cancel.load(Ordering::SeqCst) {
            return Err(TransportError::Cancelled);
        }
        std::thread::sleep(config.poll_interval);

        match discover(bus) {
            Ok(found) => {
                debug!(attempt, "meter attached");
                return Ok(found);
            }
            Err(TransportError::NoDeviceFound { .. }) => trace!(attempt, "no meter yet"),
            Err(err) => return Err(err),
        }
    }

    Err(TransportError::AttachmentTimeout {
        attempts: config.max_attempts,
        waited: config.window(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeBus, FakeNode};
    use crate::traits::CONTOUR_VENDOR_ID;

    fn fast(max_attempts: u32) -> AttachConfig {
        AttachConfig {
            poll_interval: Duration::ZERO,
            max_attempts,
        }
    }

    #[test]
    fn default_window_is_thirty_seconds() {
        assert_eq!(AttachConfig::default().window(), Duration::from_secs(30));
    }

    #[test]
    fn meter_attached_after_polling_starts() {
        let mut bus = FakeBus::new(4);
        bus.insert_from_scan(2, FakeNode::with_ids(CONTOUR_VENDOR_ID, 0x6002), 3);

        let (handle, kind) =
            await_attachment(&mut bus, &fast(10), &AtomicBool::new(false)).unwrap();

        assert_eq!(kind, DeviceKind::ContourUsb);
        assert!(handle.is_open());
        assert_eq!(bus.scans(), 3);
    }

    #[test]
    fn meter_present_on_first_poll_is_rejected() {
        let mut bus = FakeBus::new(4);
        bus.insert(1, FakeNode::with_ids(CONTOUR_VENDOR_ID, 0x7410));

        let err = await_attachment(&mut bus, &fast(10), &AtomicBool::new(false)).unwrap_err();

        assert!(matches!(err, TransportError::AlreadyAttached { .. }));
        assert_eq!(bus.open_nodes(), 0);
        assert_eq!(bus.scans(), 1);
    }

    #[test]
    fn times_out_after_max_attempts() {
        let mut bus = FakeBus::new(2);

        let err = await_attachment(&mut bus, &fast(5), &AtomicBool::new(false)).unwrap_err();

        assert!(matches!(err, TransportError::AttachmentTimeout { attempts: 5, .. }));
        assert_eq!(bus.scans(), 6);
    }

    #[test]
    fn cancellation_checked_each_poll() {
        let mut bus = FakeBus::new(2);

        let err = await_attachment(&mut bus, &fast(5), &AtomicBool::new(true)).unwrap_err();

        assert!(matches!(err, TransportError::Cancelled));
        assert_eq!(bus.scans(), 1);
    }

    #[test]
    fn denied_node_does_not_stop_polling() {
        let mut bus = FakeBus::new(4);
        bus.deny(0);
        bus.insert_from_scan(2, FakeNode::with_ids(CONTOUR_VENDOR_ID, 0x6002), 3);

        let (handle, kind) =
            await_attachment(&mut bus, &fast(10), &AtomicBool::new(false)).unwrap();

        assert_eq!(kind, DeviceKind::ContourUsb);
        assert_eq!(handle.path(), std::path::Path::new("/fake/hiddev2"));
        assert_eq!(bus.scans(), 3);
    }

    #[test]
    fn identity_failure_aborts_polling() {
        let mut bus = FakeBus::new(2);
        bus.insert_from_scan(1, FakeNode::broken(), 2);

        let err = await_attachment(&mut bus, &fast(5), &AtomicBool::new(false)).unwrap_err();
        assert!(matches!(err, TransportError::DeviceAccess { .. }));
        assert_eq!(bus.scans(), 2);
    }
}
