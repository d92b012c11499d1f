//! Device, configuration and interface records.

use super::endpoint::Endpoint;
use super::slots::SlotArray;
use super::speed::UsbSpeed;
use std::fmt;

/// Unique device identifier: bus number plus device number on that bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceKey {
    pub bus: u8,
    pub device: u8,
}

impl DeviceKey {
    pub fn new(bus: u8, device: u8) -> Self {
        Self { bus, device }
    }

    /// Pack into `(bus << 8) | device`.
    pub fn compact(&self) -> u16 {
        (u16::from(self.bus) << 8) | u16::from(self.device)
    }

    pub fn from_compact(key: u16) -> Self {
        Self {
            bus: (key >> 8) as u8,
            device: (key & 0xff) as u8,
        }
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}:{:03}", self.bus, self.device)
    }
}

/// Bus bandwidth usage (`B:` line, root hubs only).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bandwidth {
    /// Allocated periodic bandwidth in microseconds per frame.
    pub allocated: Option<u32>,
    /// Frame budget in microseconds.
    pub total: Option<u32>,
    pub percent: Option<u32>,
    pub interrupt_requests: Option<u32>,
    pub isochronous_requests: Option<u32>,
}

/// Device descriptor fields (`D:` line).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// USB version string (e.g., "2.00").
    pub usb_version: Option<String>,
    pub class: Option<String>,
    pub sub_class: Option<String>,
    pub protocol: Option<String>,
    /// Max packet size of endpoint zero.
    pub max_packet_size: Option<u16>,
    pub num_configurations: Option<u8>,
}

/// Vendor/product identification (`P:` line).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductIds {
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
    /// Device release number (e.g., "1.10").
    pub revision: Option<String>,
}

/// One interface (alternate setting) of a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub interface_number: Option<u8>,
    pub alternate_number: Option<u8>,
    /// Bound driver name, absent when no driver is attached.
    pub name: Option<String>,
    pub class: Option<String>,
    pub sub_class: Option<String>,
    pub protocol: Option<String>,
    pub num_endpoints: Option<u8>,
    /// Marked `*` as the active alternate setting.
    pub active: bool,
    pub endpoints: SlotArray<Endpoint>,
}

impl Interface {
    pub fn new(max_endpoints: usize) -> Self {
        Self {
            interface_number: None,
            alternate_number: None,
            name: None,
            class: None,
            sub_class: None,
            protocol: None,
            num_endpoints: None,
            active: false,
            endpoints: SlotArray::new(max_endpoints),
        }
    }
}

/// One configuration of a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub config_number: Option<u8>,
    pub num_interfaces: Option<u8>,
    /// bmAttributes flags.
    pub attributes: Option<u8>,
    /// Power draw as printed, e.g. "100mA".
    pub max_power: Option<String>,
    /// Marked `*` as the active configuration.
    pub active: bool,
    pub interfaces: SlotArray<Interface>,
}

impl Configuration {
    pub fn new(max_interfaces: usize) -> Self {
        Self {
            config_number: None,
            num_interfaces: None,
            attributes: None,
            max_power: None,
            active: false,
            interfaces: SlotArray::new(max_interfaces),
        }
    }
}

/// A USB device (includes hubs and root hubs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDevice {
    pub bus: u8,
    pub device_number: u8,
    /// Device number of the upstream hub, 0 for a bus root.
    pub parent_number: u8,
    /// Tier in the topology (0 = root hub).
    pub level: Option<u8>,
    /// Port on the parent hub (zero-based slot index).
    pub port: u8,
    /// Display name, filled in by [`crate::model::name_devices`].
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    /// Product string.
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub speed: UsbSpeed,
    /// Number of downstream ports declared by the device.
    pub max_children: u8,
    /// Downstream devices indexed by port.
    pub children: SlotArray<DeviceKey>,
    pub bandwidth: Option<Bandwidth>,
    pub descriptor: Option<DeviceDescriptor>,
    pub ids: Option<ProductIds>,
    pub configs: SlotArray<Configuration>,
}

impl UsbDevice {
    /// Create a device record from its topology identity.
    pub fn new(bus: u8, device_number: u8, parent_number: u8, max_configs: usize) -> Self {
        Self {
            bus,
            device_number,
            parent_number,
            level: None,
            port: 0,
            name: None,
            manufacturer: None,
            product: None,
            serial_number: None,
            speed: UsbSpeed::Unknown,
            max_children: 0,
            children: SlotArray::new(0),
            bandwidth: None,
            descriptor: None,
            ids: None,
            configs: SlotArray::new(max_configs),
        }
    }

    pub fn key(&self) -> DeviceKey {
        DeviceKey::new(self.bus, self.device_number)
    }

    /// Parent key, or `None` for a bus root.
    pub fn parent_key(&self) -> Option<DeviceKey> {
        (self.parent_number != 0).then(|| DeviceKey::new(self.bus, self.parent_number))
    }

    pub fn is_bus_root(&self) -> bool {
        self.parent_number == 0
    }

    /// Derived name, or "Unknown Device" before naming has run.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown Device")
    }

    pub fn vendor_id(&self) -> Option<u16> {
        self.ids.as_ref().and_then(|ids| ids.vendor_id)
    }

    pub fn product_id(&self) -> Option<u16> {
        self.ids.as_ref().and_then(|ids| ids.product_id)
    }

    /// Format VID:PID as string, if both are known.
    pub fn vid_pid(&self) -> Option<String> {
        Some(format!(
            "{:04x}:{:04x}",
            self.vendor_id()?,
            self.product_id()?
        ))
    }

    /// Config key for label lookup (VID:PID:serial or VID:PID if no serial).
    pub fn config_key(&self) -> Option<String> {
        let vid_pid = self.vid_pid()?;
        match &self.serial_number {
            Some(serial) if !serial.is_empty() => Some(format!("{}:{}", vid_pid, serial)),
            _ => Some(vid_pid),
        }
    }

    /// Is this a hub? (bDeviceClass == 0x09).
    pub fn is_hub(&self) -> bool {
        self.max_children > 0
            || self
                .descriptor
                .as_ref()
                .and_then(|d| d.class.as_deref())
                .is_some_and(|class| class.starts_with("09"))
    }

    pub fn descriptor_mut(&mut self) -> &mut DeviceDescriptor {
        self.descriptor.get_or_insert_with(DeviceDescriptor::default)
    }

    pub fn ids_mut(&mut self) -> &mut ProductIds {
        self.ids.get_or_insert_with(ProductIds::default)
    }

    pub fn bandwidth_mut(&mut self) -> &mut Bandwidth {
        self.bandwidth.get_or_insert_with(Bandwidth::default)
    }
}
