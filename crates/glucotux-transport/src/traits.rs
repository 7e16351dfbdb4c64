use std::path::PathBuf;

use crate::error::Result;

/// USB vendor code shared by every supported meter.
pub const CONTOUR_VENDOR_ID: u16 = 0x1a79;

/// Number of report units delivered by one raw read.
pub const REPORT_LEN: usize = 64;

/// Identity reported by a HID node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
    pub bus_type: u32,
    pub bus_num: u32,
    pub dev_num: u32,
    pub if_num: u32,
}

/// Supported meter variants, keyed by USB product code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    ContourUsb,
    ContourNextUsb,
    ContourNextOne,
}

impl DeviceKind {
    /// Every allow-listed variant.
    pub const ALL: [DeviceKind; 3] = [
        DeviceKind::ContourUsb,
        DeviceKind::ContourNextUsb,
        DeviceKind::ContourNextOne,
    ];

    pub fn product_id(self) -> u16 {
        match self {
            DeviceKind::ContourUsb => 0x6002,
            DeviceKind::ContourNextUsb => 0x7410,
            DeviceKind::ContourNextOne => 0x7800,
        }
    }

    /// Match a vendor/product pair against the allow-list.
    pub fn from_ids(vendor: u16, product: u16) -> Option<Self> {
        if vendor != CONTOUR_VENDOR_ID {
            return None;
        }
        Self::ALL.into_iter().find(|kind| kind.product_id() == product)
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceKind::ContourUsb => "Contour USB",
            DeviceKind::ContourNextUsb => "Contour Next USB",
            DeviceKind::ContourNextOne => "Contour Next One",
        }
    }

    /// Whether the meter announces readiness with an ENQ status byte.
    ///
    /// Variants that don't need a fixed settle delay before the transfer.
    pub fn signals_ready(self) -> bool {
        matches!(self, DeviceKind::ContourUsb)
    }

    /// Number of timestamp digits carried by result records.
    pub fn timestamp_width(self) -> usize {
        match self {
            DeviceKind::ContourUsb => 12,
            DeviceKind::ContourNextUsb | DeviceKind::ContourNextOne => 14,
        }
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw report I/O against an open device.
pub trait HidTransport {
    /// Perform one raw read of a report batch.
    ///
    /// Each report unit contributes one payload byte to `out`. Returns the
    /// number of bytes written. `out` must hold at least [`REPORT_LEN`] bytes.
    fn read_report(&mut self, out: &mut [u8]) -> Result<usize>;

    /// Set every value of the single output report and commit it.
    fn write_report(&mut self, values: &[u8]) -> Result<()>;
}

impl<T: HidTransport + ?Sized> HidTransport for &mut T {
    fn read_report(&mut self, out: &mut [u8]) -> Result<usize> {
        (**self).read_report(out)
    }

    fn write_report(&mut self, values: &[u8]) -> Result<()> {
        (**self).write_report(values)
    }
}

/// An opened, not yet identified, HID node.
pub trait HidNode: HidTransport {
    /// Query vendor/product and bus identity.
    fn device_info(&mut self) -> Result<DeviceInfo>;

    /// Resolve the usage code addressing the output report.
    ///
    /// Only called on nodes that matched the allow-list.
    fn resolve_output_usage(&mut self) -> Result<u32>;
}

/// A fixed, numbered set of candidate HID nodes.
pub trait HidBus {
    type Node: HidNode;

    /// Number of candidate nodes (indices `0..node_count()`).
    fn node_count(&self) -> usize;

    /// Path of candidate `index`, for diagnostics.
    fn node_path(&self, index: usize) -> PathBuf;

    /// Open candidate `index`.
    ///
    /// Returns `Ok(None)` when the node does not exist.
    fn open(&mut self, index: usize) -> Result<Option<Self::Node>>;
}
