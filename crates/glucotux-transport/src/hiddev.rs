//! Linux `hiddev` backend.
//!
//! Meters show up as `/dev/usb/hiddevN`. Identity and output reports go
//! through the hiddev ioctl interface; input arrives as a stream of
//! `struct hiddev_event` records, one per report unit.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::os::fd::AsRawFd;
use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::traits::{DeviceInfo, HidBus, HidNode, HidTransport, REPORT_LEN};

const DEFAULT_PREFIX: &str = "/dev/usb/hiddev";
const DEFAULT_MAX_NODES: usize = 16;

const HID_REPORT_TYPE_OUTPUT: u32 = 2;
const HID_REPORT_ID_FIRST: u32 = 0x100;

/// `struct hiddev_event`: `unsigned hid; signed int value;`
const EVENT_SIZE: usize = 8;

#[repr(C)]
#[derive(Default)]
struct HiddevDevinfo {
    bustype: u32,
    busnum: u32,
    devnum: u32,
    ifnum: u32,
    vendor: i16,
    product: i16,
    version: i16,
    num_applications: u32,
}

#[repr(C)]
#[derive(Default)]
struct HiddevReportInfo {
    report_type: u32,
    report_id: u32,
    num_fields: u32,
}

#[repr(C)]
#[derive(Default)]
struct HiddevUsageRef {
    report_type: u32,
    report_id: u32,
    field_index: u32,
    usage_index: u32,
    usage_code: u32,
    value: i32,
}

const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;

// Generic `_IOC` layout (x86, arm, riscv): dir:2 | size:14 | type:8 | nr:8.
const fn ioc(dir: u32, nr: u32, size: usize) -> u32 {
    (dir << 30) | ((size as u32) << 16) | ((b'H' as u32) << 8) | nr
}

const HIDIOCGDEVINFO: u32 = ioc(IOC_READ, 0x03, std::mem::size_of::<HiddevDevinfo>());
const HIDIOCSREPORT: u32 = ioc(IOC_WRITE, 0x08, std::mem::size_of::<HiddevReportInfo>());
const HIDIOCGREPORTINFO: u32 = ioc(
    IOC_READ | IOC_WRITE,
    0x09,
    std::mem::size_of::<HiddevReportInfo>(),
);
const HIDIOCSUSAGE: u32 = ioc(IOC_WRITE, 0x0C, std::mem::size_of::<HiddevUsageRef>());
const HIDIOCGUCODE: u32 = ioc(
    IOC_READ | IOC_WRITE,
    0x0D,
    std::mem::size_of::<HiddevUsageRef>(),
);

/// The numbered hiddev nodes of this machine.
#[derive(Debug, Clone)]
pub struct HiddevBus {
    prefix: String,
    max_nodes: usize,
}

impl Default for HiddevBus {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX, DEFAULT_MAX_NODES)
    }
}

impl HiddevBus {
    /// Nodes `{prefix}0` to `{prefix}{max_nodes - 1}`.
    pub fn new(prefix: impl Into<String>, max_nodes: usize) -> Self {
        Self {
            prefix: prefix.into(),
            max_nodes,
        }
    }

    /// The default number of nodes under another prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::new(prefix, DEFAULT_MAX_NODES)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl HidBus for HiddevBus {
    type Node = HiddevNode;

    fn node_count(&self) -> usize {
        self.max_nodes
    }

    fn node_path(&self, index: usize) -> PathBuf {
        PathBuf::from(format!("{}{}", self.prefix, index))
    }

    fn open(&mut self, index: usize) -> Result<Option<HiddevNode>> {
        let path = self.node_path(index);
        match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => {
                trace!(?path, fd = file.as_raw_fd(), "opened hid node");
                Ok(Some(HiddevNode {
                    file,
                    path,
                    usage_code: 0,
                }))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) if matches!(err.raw_os_error(), Some(libc::ENODEV | libc::ENXIO)) => Ok(None),
            Err(source) => Err(TransportError::DeviceAccess { path, source }),
        }
    }
}

/// One open `/dev/usb/hiddevN` node.
#[derive(Debug)]
pub struct HiddevNode {
    file: File,
    path: PathBuf,
    usage_code: u32,
}

impl HiddevNode {
    fn ioctl<T>(&self, request: u32, arg: &mut T) -> std::io::Result<()> {
        // SAFETY: `arg` is a live, exclusively borrowed `#[repr(C)]` struct whose
        // size is the one encoded in `request`, and the descriptor is owned by
        // `self.file` for the duration of the call.
        let rc = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                request as _,
                (arg as *mut T).cast::<libc::c_void>(),
            )
        };
        if rc < 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn access_error(&self, source: std::io::Error) -> TransportError {
        TransportError::DeviceAccess {
            path: self.path.clone(),
            source,
        }
    }
}

impl HidNode for HiddevNode {
    fn device_info(&mut self) -> Result<DeviceInfo> {
        let mut devinfo = HiddevDevinfo::default();
        self.ioctl(HIDIOCGDEVINFO, &mut devinfo)
            .map_err(|err| self.access_error(err))?;

        trace!(
            path = ?self.path,
            bustype = devinfo.bustype,
            ifnum = devinfo.ifnum,
            applications = devinfo.num_applications,
            "device information"
        );

        Ok(DeviceInfo {
            vendor: devinfo.vendor as u16,
            product: devinfo.product as u16,
            version: devinfo.version as u16,
            bus_type: devinfo.bustype,
            bus_num: devinfo.busnum,
            dev_num: devinfo.devnum,
            if_num: devinfo.ifnum,
        })
    }

    fn resolve_output_usage(&mut self) -> Result<u32> {
        let mut info = HiddevReportInfo {
            report_type: HID_REPORT_TYPE_OUTPUT,
            report_id: HID_REPORT_ID_FIRST,
            num_fields: 0,
        };
        self.ioctl(HIDIOCGREPORTINFO, &mut info)
            .map_err(|err| self.access_error(err))?;
        debug!(
            path = ?self.path,
            report_id = info.report_id,
            fields = info.num_fields,
            "output report"
        );

        let mut uref = HiddevUsageRef {
            report_type: HID_REPORT_TYPE_OUTPUT,
            ..HiddevUsageRef::default()
        };
        self.ioctl(HIDIOCGUCODE, &mut uref)
            .map_err(|err| self.access_error(err))?;

        self.usage_code = uref.usage_code;
        Ok(uref.usage_code)
    }
}

impl HidTransport for HiddevNode {
    fn read_report(&mut self, out: &mut [u8]) -> Result<usize> {
        if out.len() < REPORT_LEN {
            return Err(TransportError::BufferTooSmall {
                len: out.len(),
                min: REPORT_LEN,
            });
        }

        // The driver may hand out fewer events than one batch per read.
        let mut events = [0u8; REPORT_LEN * EVENT_SIZE];
        let mut read = 0;
        while read < events.len() {
            match self.file.read(&mut events[read..]) {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Read(err)),
            }
        }

        let count = read / EVENT_SIZE;
        let events = events[..count * EVENT_SIZE].chunks_exact(EVENT_SIZE);
        for (slot, event) in out.iter_mut().zip(events) {
            let value = i32::from_ne_bytes([event[4], event[5], event[6], event[7]]);
            *slot = (value & 0xff) as u8;
        }

        Ok(count)
    }

    fn write_report(&mut self, values: &[u8]) -> Result<()> {
        let mut uref = HiddevUsageRef {
            report_type: HID_REPORT_TYPE_OUTPUT,
            report_id: 0,
            field_index: 0,
            usage_code: self.usage_code,
            ..HiddevUsageRef::default()
        };

        for (index, &value) in values.iter().enumerate() {
            uref.usage_index = index as u32;
            uref.value = i32::from(value);
            self.ioctl(HIDIOCSUSAGE, &mut uref)
                .map_err(TransportError::Write)?;
        }

        let mut info = HiddevReportInfo {
            report_type: HID_REPORT_TYPE_OUTPUT,
            report_id: 0,
            num_fields: 1,
        };
        self.ioctl(HIDIOCSREPORT, &mut info)
            .map_err(TransportError::Write)
    }
}
