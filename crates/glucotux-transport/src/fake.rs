//! In-memory bus used by the discovery and attachment tests.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;

use crate::error::{Result, TransportError};
use crate::traits::{DeviceInfo, HidBus, HidNode, HidTransport};

#[derive(Clone)]
pub(crate) struct FakeNode {
    ids: Option<(u16, u16)>,
    live: Option<Rc<Cell<usize>>>,
}

impl FakeNode {
    pub(crate) fn with_ids(vendor: u16, product: u16) -> Self {
        Self {
            ids: Some((vendor, product)),
            live: None,
        }
    }

    /// A node whose identity query fails.
    pub(crate) fn broken() -> Self {
        Self {
            ids: None,
            live: None,
        }
    }
}

impl HidTransport for FakeNode {
    fn read_report(&mut self, _out: &mut [u8]) -> Result<usize> {
        Ok(0)
    }

    fn write_report(&mut self, _values: &[u8]) -> Result<()> {
        Ok(())
    }
}

impl HidNode for FakeNode {
    fn device_info(&mut self) -> Result<DeviceInfo> {
        let (vendor, product) = self.ids.ok_or_else(|| TransportError::DeviceAccess {
            path: PathBuf::from("/fake"),
            source: std::io::Error::other("identity query failed"),
        })?;
        Ok(DeviceInfo {
            vendor,
            product,
            ..DeviceInfo::default()
        })
    }

    fn resolve_output_usage(&mut self) -> Result<u32> {
        Ok(0xff00_0001)
    }
}

impl Drop for FakeNode {
    fn drop(&mut self) {
        if let Some(live) = &self.live {
            live.set(live.get() - 1);
        }
    }
}

pub(crate) struct FakeBus {
    count: usize,
    nodes: HashMap<usize, (FakeNode, usize)>,
    denied: HashSet<usize>,
    opened: Vec<usize>,
    live: Rc<Cell<usize>>,
    scans: usize,
}

impl FakeBus {
    pub(crate) fn new(count: usize) -> Self {
        Self {
            count,
            nodes: HashMap::new(),
            denied: HashSet::new(),
            opened: Vec::new(),
            live: Rc::new(Cell::new(0)),
            scans: 0,
        }
    }

    pub(crate) fn insert(&mut self, index: usize, node: FakeNode) {
        self.nodes.insert(index, (node, 0));
    }

    /// Make `node` visible starting with the `scan`-th pass over the bus.
    pub(crate) fn insert_from_scan(&mut self, index: usize, node: FakeNode, scan: usize) {
        self.nodes.insert(index, (node, scan));
    }

    pub(crate) fn deny(&mut self, index: usize) {
        self.denied.insert(index);
    }

    pub(crate) fn opened(&self) -> Vec<usize> {
        self.opened.clone()
    }

    pub(crate) fn open_nodes(&self) -> usize {
        self.live.get()
    }

    pub(crate) fn scans(&self) -> usize {
        self.scans
    }
}

impl HidBus for FakeBus {
    type Node = FakeNode;

    fn node_count(&self) -> usize {
        self.count
    }

    fn node_path(&self, index: usize) -> PathBuf {
        PathBuf::from(format!("/fake/hiddev{index}"))
    }

    fn open(&mut self, index: usize) -> Result<Option<FakeNode>> {
        if index == 0 {
            self.scans += 1;
        }
        self.opened.push(index);

        if self.denied.contains(&index) {
            return Err(TransportError::DeviceAccess {
                path: self.node_path(index),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }

        match self.nodes.get(&index) {
            Some((node, visible_from)) if *visible_from <= self.scans => {
                let mut node = node.clone();
                node.live = Some(Rc::clone(&self.live));
                self.live.set(self.live.get() + 1);
                Ok(Some(node))
            }
            _ => Ok(None),
        }
    }
}
