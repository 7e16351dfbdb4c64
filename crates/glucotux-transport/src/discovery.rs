use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::traits::{DeviceInfo, DeviceKind, HidBus, HidNode, HidTransport};

/// Exclusive session handle on a discovered meter.
///
/// Owns the open node; the descriptor is released by [`DeviceHandle::close`]
/// or when the handle is dropped, whichever comes first.
pub struct DeviceHandle<N> {
    node: Option<N>,
    path: PathBuf,
    info: DeviceInfo,
    usage_code: u32,
}

impl<N> DeviceHandle<N> {
    pub(crate) fn new(node: N, path: PathBuf, info: DeviceInfo, usage_code: u32) -> Self {
        Self {
            node: Some(node),
            path,
            info,
            usage_code,
        }
    }

    /// Node path this handle was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identity reported during discovery.
    pub fn info(&self) -> DeviceInfo {
        self.info
    }

    /// Usage code addressing the output report.
    pub fn usage_code(&self) -> u32 {
        self.usage_code
    }

    pub fn is_open(&self) -> bool {
        self.node.is_some()
    }

    /// Release the descriptor. Calling this on a closed handle does nothing.
    pub fn close(&mut self) {
        if self.node.take().is_some() {
            debug!(path = ?self.path, "closing device handle");
        }
    }

    fn node_mut(&mut self) -> Result<&mut N> {
        self.node.as_mut().ok_or(TransportError::Closed)
    }
}

impl<N: HidTransport> HidTransport for DeviceHandle<N> {
    fn read_report(&mut self, out: &mut [u8]) -> Result<usize> {
        self.node_mut()?.read_report(out)
    }

    fn write_report(&mut self, values: &[u8]) -> Result<()> {
        self.node_mut()?.write_report(values)
    }
}

impl<N> Drop for DeviceHandle<N> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<N> std::fmt::Debug for DeviceHandle<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("path", &self.path)
            .field("vendor", &format_args!("{:#06x}", self.info.vendor))
            .field("product", &format_args!("{:#06x}", self.info.product))
            .field("open", &self.node.is_some())
            .finish()
    }
}

/// Find the first attached meter.
///
/// Candidates are opened in index order; the scan stops at the first node
/// whose vendor code and product code are allow-listed. Nodes that don't
/// match are closed before the next one is opened. Nodes that cannot be
/// opened are skipped; only a failed identity query on an opened node is
/// an error.
pub fn discover<B: HidBus>(bus: &mut B) -> Result<(DeviceHandle<B::Node>, DeviceKind)> {
    let mut skipped = 0;

    for index in 0..bus.node_count() {
        let path = bus.node_path(index);
        trace!(?path, "opening hid node");

        let mut node = match bus.open(index) {
            Ok(Some(node)) => node,
            Ok(None) => continue,
            Err(err) => {
                debug!(?path, error = %err, "skipping hid node that cannot be opened");
                skipped += 1;
                continue;
            }
        };

        let info = node.device_info()?;
        trace!(
            ?path,
            vendor = format_args!("{:#06x}", info.vendor),
            product = format_args!("{:#06x}", info.product),
            bus = info.bus_num,
            dev = info.dev_num,
            "hid node identity"
        );

        let Some(kind) = DeviceKind::from_ids(info.vendor, info.product) else {
            debug!(?path, "vendor and product do not match");
            drop(node);
            continue;
        };

        let usage_code = node.resolve_output_usage()?;
        info!(?path, %kind, "meter found");
        return Ok((DeviceHandle::new(node, path, info, usage_code), kind));
    }

    Err(TransportError::NoDeviceFound {
        scanned: bus.node_count(),
        skipped,
    })
}

/// Outcome of probing one candidate node.
#[derive(Debug)]
pub struct ScannedNode {
    pub index: usize,
    pub path: PathBuf,
    pub info: Option<DeviceInfo>,
    pub kind: Option<DeviceKind>,
    pub error: Option<String>,
}

/// Query every existing candidate node without stopping at the first match.
///
/// Used for diagnostics; every opened node is closed again before returning.
pub fn scan<B: HidBus>(bus: &mut B) -> Vec<ScannedNode> {
    let mut nodes = Vec::new();

    for index in 0..bus.node_count() {
        let path = bus.node_path(index);
        let (info, error) = match bus.open(index) {
            Ok(None) => continue,
            Ok(Some(mut node)) => match node.device_info() {
                Ok(info) => (Some(info), None),
                Err(err) => (None, Some(err.to_string())),
            },
            Err(err) => (None, Some(err.to_string())),
        };
        let kind = info.and_then(|info| DeviceKind::from_ids(info.vendor, info.product));
        nodes.push(ScannedNode {
            index,
            path,
            info,
            kind,
            error,
        });
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeBus, FakeNode};
    use crate::traits::CONTOUR_VENDOR_ID;

    #[test]
    fn finds_allow_listed_node_and_stops() {
        let mut bus = FakeBus::new(8);
        bus.insert(1, FakeNode::with_ids(0x046d, 0xc52b));
        bus.insert(3, FakeNode::with_ids(CONTOUR_VENDOR_ID, 0x7410));
        bus.insert(5, FakeNode::with_ids(CONTOUR_VENDOR_ID, 0x6002));

        let (handle, kind) = discover(&mut bus).unwrap();

        assert_eq!(kind, DeviceKind::ContourNextUsb);
        assert_eq!(handle.path(), Path::new("/fake/hiddev3"));
        assert_eq!(handle.info().product, 0x7410);
        assert_eq!(handle.usage_code(), 0xff00_0001);
        assert_eq!(bus.opened(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn non_matching_nodes_are_closed() {
        let mut bus = FakeBus::new(4);
        bus.insert(0, FakeNode::with_ids(0x046d, 0xc52b));
        bus.insert(2, FakeNode::with_ids(CONTOUR_VENDOR_ID, 0x6002));

        let (_handle, _kind) = discover(&mut bus).unwrap();
        assert_eq!(bus.open_nodes(), 1);
    }

    #[test]
    fn no_device_found_after_all_candidates() {
        let mut bus = FakeBus::new(4);
        bus.insert(0, FakeNode::with_ids(0x046d, 0xc52b));

        let err = discover(&mut bus).unwrap_err();
        assert!(matches!(err, TransportError::NoDeviceFound { scanned: 4, skipped: 0 }));
        assert_eq!(bus.opened(), vec![0, 1, 2, 3]);
        assert_eq!(bus.open_nodes(), 0);
    }

    #[test]
    fn identity_query_failure_is_access_error() {
        let mut bus = FakeBus::new(4);
        bus.insert(1, FakeNode::broken());

        let err = discover(&mut bus).unwrap_err();
        assert!(matches!(err, TransportError::DeviceAccess { .. }));
    }

    #[test]
    fn nodes_that_cannot_be_opened_are_skipped() {
        let mut bus = FakeBus::new(4);
        bus.deny(0);
        bus.deny(2);

        let err = discover(&mut bus).unwrap_err();
        assert!(matches!(
            err,
            TransportError::NoDeviceFound {
                scanned: 4,
                skipped: 2
            }
        ));
        assert_eq!(bus.opened(), vec![0, 1, 2, 3]);

        bus.insert(3, FakeNode::with_ids(CONTOUR_VENDOR_ID, 0x7800));
        let (handle, kind) = discover(&mut bus).unwrap();
        assert_eq!(kind, DeviceKind::ContourNextOne);
        assert_eq!(handle.path(), Path::new("/fake/hiddev3"));
    }

    #[test]
    fn close_is_idempotent() {
        let mut bus = FakeBus::new(1);
        bus.insert(0, FakeNode::with_ids(CONTOUR_VENDOR_ID, 0x6002));

        let (mut handle, _) = discover(&mut bus).unwrap();
        handle.close();
        handle.close();
        assert!(!handle.is_open());
        assert_eq!(bus.open_nodes(), 0);

        let mut buf = [0u8; 64];
        assert!(matches!(
            handle.read_report(&mut buf),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn scan_lists_every_existing_node() {
        let mut bus = FakeBus::new(6);
        bus.insert(0, FakeNode::with_ids(0x046d, 0xc52b));
        bus.insert(4, FakeNode::with_ids(CONTOUR_VENDOR_ID, 0x7800));

        let nodes = scan(&mut bus);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].kind, None);
        assert_eq!(nodes[1].index, 4);
        assert_eq!(nodes[1].kind, Some(DeviceKind::ContourNextOne));
        assert_eq!(bus.open_nodes(), 0);
    }
}
