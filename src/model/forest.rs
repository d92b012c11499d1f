//! The device forest: every bus root under one synthetic root device.

use super::device::{DeviceKey, UsbDevice};
use super::slots::SlotArray;
use std::collections::{HashMap, HashSet};

/// Name of the synthetic root device.
pub const ROOT_NAME: &str = "USB Buses";

/// Bus numbers are a single byte, so the root has one slot per value.
const MAX_BUSES: usize = 256;

/// Result of attaching a finalized device to the forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachOutcome {
    /// Device is reachable from the root.
    Attached {
        /// Device that previously held the same port and is now unreachable.
        displaced: Option<DeviceKey>,
        /// An earlier device with the same key was replaced.
        duplicate: bool,
    },
    /// Parent not found; device kept in the orphan list.
    Orphaned { parent: DeviceKey },
    /// Port lies outside the parent's capacity; device dropped.
    NoCapacity {
        parent: Option<DeviceKey>,
        port: usize,
        capacity: usize,
    },
}

/// Complete device forest from one parse of the devices dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbForest {
    /// Synthetic root; child slot `n` holds the root hub of bus `n`.
    root: UsbDevice,
    /// Every attached device, by key.
    devices: HashMap<DeviceKey, UsbDevice>,
    /// Devices whose parent could not be resolved.
    orphans: Vec<UsbDevice>,
}

impl Default for UsbForest {
    fn default() -> Self {
        Self::new()
    }
}

impl UsbForest {
    /// Create an empty forest.
    pub fn new() -> Self {
        let mut root = UsbDevice::new(0, 0, 0, 0);
        root.name = Some(ROOT_NAME.to_string());
        root.children = SlotArray::new(MAX_BUSES);
        Self {
            root,
            devices: HashMap::new(),
            orphans: Vec::new(),
        }
    }

    /// Incorporate a finalized device.
    ///
    /// Bus roots land in the root's slot for their bus; everything else goes
    /// into its parent's slot for its port. `max_children` caps the parent's
    /// declared port count. On a port collision the newer device wins.
    pub fn attach(&mut self, mut device: UsbDevice, max_children: usize) -> AttachOutcome {
        let key = device.key();
        let parent = device.parent_key();
        let index = match parent {
            None => usize::from(device.bus),
            Some(_) => usize::from(device.port),
        };

        if let Some(parent_key) = parent
            && !self.devices.contains_key(&parent_key)
        {
            self.orphans.push(device);
            return AttachOutcome::Orphaned { parent: parent_key };
        }

        device.children = SlotArray::new(usize::from(device.max_children).min(max_children));

        // A record that cannot be placed must not evict an earlier one with its key.
        let capacity = match parent {
            None => self.root.children.capacity(),
            Some(parent_key) => self
                .devices
                .get(&parent_key)
                .map_or(0, |d| d.children.capacity()),
        };
        if index >= capacity {
            return AttachOutcome::NoCapacity {
                parent,
                port: index,
                capacity,
            };
        }

        let duplicate = self.detach(key);
        let Some(slots) = self.child_slots(parent) else {
            // Only reachable when a device replaces its own parent.
            self.orphans.push(device);
            return AttachOutcome::Orphaned {
                parent: parent.unwrap_or(key),
            };
        };

        match slots.insert(index, key) {
            Ok(displaced) => {
                self.devices.insert(key, device);
                AttachOutcome::Attached {
                    displaced: displaced.filter(|old| *old != key),
                    duplicate,
                }
            }
            Err(err) => AttachOutcome::NoCapacity {
                parent,
                port: index,
                capacity: err.capacity,
            },
        }
    }

    /// Remove an attached device and unlink it from its parent.
    fn detach(&mut self, key: DeviceKey) -> bool {
        let Some(old) = self.devices.remove(&key) else {
            return false;
        };
        let index = match old.parent_key() {
            None => usize::from(old.bus),
            Some(_) => usize::from(old.port),
        };
        if let Some(slots) = self.child_slots(old.parent_key())
            && slots.get(index) == Some(&key)
        {
            slots.remove(index);
        }
        true
    }

    fn child_slots(&mut self, parent: Option<DeviceKey>) -> Option<&mut SlotArray<DeviceKey>> {
        match parent {
            None => Some(&mut self.root.children),
            Some(key) => self.devices.get_mut(&key).map(|d| &mut d.children),
        }
    }

    /// The synthetic "all buses" device.
    pub fn root(&self) -> &UsbDevice {
        &self.root
    }

    /// Root hubs in bus order.
    pub fn bus_roots(&self) -> impl Iterator<Item = &UsbDevice> + '_ {
        self.children(&self.root).map(|(_, d)| d)
    }

    /// Look up an attached device.
    pub fn get(&self, key: DeviceKey) -> Option<&UsbDevice> {
        self.devices.get(&key)
    }

    /// Look up by `(bus << 8) | device`.
    pub fn get_compact(&self, key: u16) -> Option<&UsbDevice> {
        self.get(DeviceKey::from_compact(key))
    }

    /// Children of a device with their slot index, in slot order.
    pub fn children<'a>(
        &'a self,
        device: &'a UsbDevice,
    ) -> impl Iterator<Item = (usize, &'a UsbDevice)> + 'a {
        device
            .children
            .iter()
            .filter_map(|(slot, key)| self.devices.get(key).map(|d| (slot, d)))
    }

    /// Devices reachable from the root in depth-first slot order, with depth
    /// (0 = bus root). The synthetic root itself is not included.
    pub fn walk(&self) -> Vec<(usize, &UsbDevice)> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        for bus_root in self.bus_roots() {
            self.walk_recursive(bus_root, 0, &mut seen, &mut result);
        }
        result
    }

    fn walk_recursive<'a>(
        &'a self,
        device: &'a UsbDevice,
        depth: usize,
        seen: &mut HashSet<DeviceKey>,
        result: &mut Vec<(usize, &'a UsbDevice)>,
    ) {
        if !seen.insert(device.key()) {
            return;
        }
        result.push((depth, device));
        for (_, child) in self.children(device) {
            self.walk_recursive(child, depth + 1, seen, result);
        }
    }

    /// Number of devices reachable from the root.
    pub fn reachable_count(&self) -> usize {
        self.walk().len()
    }

    /// Number of attached devices, reachable or not.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Number of buses with a root hub.
    pub fn bus_count(&self) -> usize {
        self.root.children.len()
    }

    /// Devices that could not be linked to a parent.
    pub fn orphans(&self) -> &[UsbDevice] {
        &self.orphans
    }

    /// Every device record (attached and orphaned), for post-passes.
    pub fn devices_mut(&mut self) -> impl Iterator<Item = &mut UsbDevice> + '_ {
        self.devices.values_mut().chain(self.orphans.iter_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(bus: u8, dev: u8, parent: u8, port: u8, max_children: u8) -> UsbDevice {
        let mut d = UsbDevice::new(bus, dev, parent, 8);
        d.port = port;
        d.max_children = max_children;
        d
    }

    #[test]
    fn test_bus_root_attaches_under_root() {
        let mut forest = UsbForest::new();
        let outcome = forest.attach(device(2, 1, 0, 0, 4), 32);
        assert_eq!(
            outcome,
            AttachOutcome::Attached {
                displaced: None,
                duplicate: false
            }
        );
        assert_eq!(forest.bus_count(), 1);
        assert_eq!(forest.root().children.get(2), Some(&DeviceKey::new(2, 1)));
        assert_eq!(forest.reachable_count(), 1);
    }

    #[test]
    fn test_child_uses_port_slot() {
        let mut forest = UsbForest::new();
        forest.attach(device(1, 1, 0, 0, 4), 32);
        forest.attach(device(1, 3, 1, 2, 0), 32);
        forest.attach(device(1, 2, 1, 0, 0), 32);

        let root_hub = forest.get(DeviceKey::new(1, 1)).unwrap();
        let ports: Vec<_> = forest
            .children(root_hub)
            .map(|(slot, d)| (slot, d.device_number))
            .collect();
        assert_eq!(ports, vec![(0, 2), (2, 3)]);

        let order: Vec<_> = forest
            .walk()
            .iter()
            .map(|(depth, d)| (*depth, d.device_number))
            .collect();
        assert_eq!(order, vec![(0, 1), (1, 2), (1, 3)]);
    }

    #[test]
    fn test_orphan_is_unreachable() {
        let mut forest = UsbForest::new();
        let outcome = forest.attach(device(1, 5, 4, 0, 0), 32);
        assert_eq!(
            outcome,
            AttachOutcome::Orphaned {
                parent: DeviceKey::new(1, 4)
            }
        );
        assert_eq!(forest.reachable_count(), 0);
        assert_eq!(forest.orphans().len(), 1);
        assert!(forest.get(DeviceKey::new(1, 5)).is_none());
    }

    #[test]
    fn test_port_beyond_capacity_is_dropped() {
        let mut forest = UsbForest::new();
        forest.attach(device(1, 1, 0, 0, 2), 32);
        forest.attach(device(1, 2, 1, 0, 0), 32);
        forest.attach(device(1, 3, 1, 1, 0), 32);
        let outcome = forest.attach(device(1, 4, 1, 2, 0), 32);
        assert_eq!(
            outcome,
            AttachOutcome::NoCapacity {
                parent: Some(DeviceKey::new(1, 1)),
                port: 2,
                capacity: 2
            }
        );
        assert_eq!(forest.reachable_count(), 3);
        assert!(forest.get(DeviceKey::new(1, 4)).is_none());
    }

    #[test]
    fn test_global_limit_caps_declared_ports() {
        let mut forest = UsbForest::new();
        forest.attach(device(1, 1, 0, 0, 8), 1);
        let outcome = forest.attach(device(1, 2, 1, 1, 0), 1);
        assert!(matches!(outcome, AttachOutcome::NoCapacity { capacity: 1, .. }));
    }

    #[test]
    fn test_port_collision_last_wins() {
        let mut forest = UsbForest::new();
        forest.attach(device(1, 1, 0, 0, 2), 32);
        forest.attach(device(1, 2, 1, 0, 0), 32);
        let outcome = forest.attach(device(1, 3, 1, 0, 0), 32);
        assert_eq!(
            outcome,
            AttachOutcome::Attached {
                displaced: Some(DeviceKey::new(1, 2)),
                duplicate: false
            }
        );
        let root_hub = forest.get(DeviceKey::new(1, 1)).unwrap();
        assert_eq!(root_hub.children.get(0), Some(&DeviceKey::new(1, 3)));
        assert_eq!(forest.reachable_count(), 2);
        // Still retrievable by key.
        assert!(forest.get(DeviceKey::new(1, 2)).is_some());
    }

    #[test]
    fn test_duplicate_key_replaces_previous() {
        let mut forest = UsbForest::new();
        forest.attach(device(1, 1, 0, 0, 2), 32);
        forest.attach(device(1, 2, 1, 0, 0), 32);
        let outcome = forest.attach(device(1, 2, 1, 1, 0), 32);
        assert_eq!(
            outcome,
            AttachOutcome::Attached {
                displaced: None,
                duplicate: true
            }
        );
        let root_hub = forest.get(DeviceKey::new(1, 1)).unwrap();
        assert_eq!(root_hub.children.get(0), None);
        assert_eq!(root_hub.children.get(1), Some(&DeviceKey::new(1, 2)));
        assert_eq!(forest.reachable_count(), 2);
    }

    #[test]
    fn test_duplicate_beyond_capacity_keeps_previous() {
        let mut forest = UsbForest::new();
        forest.attach(device(1, 1, 0, 0, 2), 32);
        forest.attach(device(1, 2, 1, 0, 4), 32);
        forest.attach(device(1, 3, 2, 0, 0), 32);
        let outcome = forest.attach(device(1, 2, 1, 5, 0), 32);
        assert_eq!(
            outcome,
            AttachOutcome::NoCapacity {
                parent: Some(DeviceKey::new(1, 1)),
                port: 5,
                capacity: 2
            }
        );
        assert_eq!(forest.reachable_count(), 3);
        assert_eq!(forest.device_count(), 3);
        let hub = forest.get(DeviceKey::new(1, 2)).unwrap();
        assert_eq!(hub.port, 0);
        assert_eq!(hub.children.get(0), Some(&DeviceKey::new(1, 3)));
    }

    #[test]
    fn test_compact_lookup() {
        let mut forest = UsbForest::new();
        forest.attach(device(3, 7, 0, 0, 0), 32);
        assert_eq!(forest.get_compact(0x0307).map(|d| d.bus), Some(3));
        assert!(forest.get_compact(0x0308).is_none());
    }
}
