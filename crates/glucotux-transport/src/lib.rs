//! HID transport for Contour glucose meters.
//!
//! This is the lowest layer of glucotux. It finds a meter among the numbered
//! hiddev nodes, owns the open descriptor for the duration of a session and
//! exposes raw report reads and writes through the [`HidTransport`] trait.
//!
//! Everything above this crate is written against the traits in [`traits`],
//! so the protocol layers can be driven by scripted devices in tests.

pub mod attach;
pub mod discovery;
pub mod error;
pub mod traits;

#[cfg(test)]
mod fake;

#[cfg(target_os = "linux")]
pub mod hiddev;

pub use attach::{await_attachment, AttachConfig};
pub use discovery::{discover, scan, DeviceHandle, ScannedNode};
pub use error::{Result, TransportError};
pub use traits::{
    DeviceInfo, DeviceKind, HidBus, HidNode, HidTransport, CONTOUR_VENDOR_ID, REPORT_LEN,
};

#[cfg(target_os = "linux")]
pub use hiddev::{HiddevBus, HiddevNode};
