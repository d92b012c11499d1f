//! Per-device description text shown next to the tree.

use crate::model::{Configuration, Endpoint, Interface, UsbDevice};
use std::fmt;

/// One line of a description. A line with an empty label is printed as its
/// value alone; a line with neither is a blank separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionLine {
    /// Indentation level (one tab each).
    pub depth: usize,
    pub label: &'static str,
    pub value: String,
}

impl DescriptionLine {
    fn blank() -> Self {
        Self {
            depth: 0,
            label: "",
            value: String::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.label.is_empty() && self.value.is_empty()
    }

    fn text_len(&self) -> usize {
        let label = if self.label.is_empty() {
            0
        } else {
            self.label.len() + 2
        };
        self.depth + label + self.value.len()
    }
}

impl fmt::Display for DescriptionLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_blank() {
            return Ok(());
        }
        for _ in 0..self.depth {
            f.write_str("\t")?;
        }
        if self.label.is_empty() {
            f.write_str(&self.value)
        } else {
            write!(f, "{}: {}", self.label, self.value)
        }
    }
}

/// Labelled description of one device, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Description {
    pub lines: Vec<DescriptionLine>,
}

impl Description {
    fn push(&mut self, depth: usize, label: &'static str, value: impl fmt::Display) {
        self.lines.push(DescriptionLine {
            depth,
            label,
            value: value.to_string(),
        });
    }

    fn push_opt<T: fmt::Display>(&mut self, depth: usize, label: &'static str, value: Option<T>) {
        if let Some(value) = value {
            self.push(depth, label, value);
        }
    }

    fn blank(&mut self) {
        self.lines.push(DescriptionLine::blank());
    }

    /// Replace the leading name line, e.g. with a user label.
    pub fn set_title(&mut self, title: impl Into<String>) {
        let title = title.into();
        match self.lines.first_mut() {
            Some(first) if first.label.is_empty() && !first.is_blank() => first.value = title,
            _ => self.lines.insert(
                0,
                DescriptionLine {
                    depth: 0,
                    label: "",
                    value: title,
                },
            ),
        }
    }

    /// Render as newline-separated text with tab indentation.
    pub fn to_text(&self) -> String {
        let size = self
            .lines
            .iter()
            .map(|line| line.text_len() + 1)
            .sum::<usize>();
        let mut text = String::with_capacity(size);
        for (n, line) in self.lines.iter().enumerate() {
            if n > 0 {
                text.push('\n');
            }
            text.push_str(&line.to_string());
        }
        text
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Build the description of a device. Fields that were not in the dump
/// produce no line at all.
pub fn describe(device: &UsbDevice) -> Description {
    let mut desc = Description::default();

    desc.push_opt(0, "", device.name.as_deref());
    desc.push_opt(0, "Manufacturer", device.manufacturer.as_deref());
    desc.push_opt(0, "Serial Number", device.serial_number.as_deref());
    desc.push(0, "Speed", device.speed.label());
    if device.max_children > 0 {
        desc.push(0, "Number of Ports", device.max_children);
    }

    if let Some(bw) = &device.bandwidth {
        if let (Some(allocated), Some(total)) = (bw.allocated, bw.total) {
            let value = match bw.percent {
                Some(percent) => format!("{} / {} ({}%)", allocated, total, percent),
                None => format!("{} / {}", allocated, total),
            };
            desc.push(0, "Bandwidth allocated", value);
        }
        desc.push_opt(0, "Total number of interrupt requests", bw.interrupt_requests);
        desc.push_opt(0, "Total number of isochronous requests", bw.isochronous_requests);
    }

    if let Some(d) = &device.descriptor {
        desc.push_opt(0, "USB Version", d.usb_version.as_deref());
        desc.push_opt(0, "Device Class", d.class.as_deref());
        desc.push_opt(0, "Device Subclass", d.sub_class.as_deref());
        desc.push_opt(0, "Device Protocol", d.protocol.as_deref());
        desc.push_opt(0, "Maximum Default Endpoint Size", d.max_packet_size);
        desc.push_opt(0, "Number of Configurations", d.num_configurations);
    }

    if let Some(ids) = &device.ids {
        desc.push_opt(0, "Vendor Id", ids.vendor_id.map(|id| format!("{:04x}", id)));
        desc.push_opt(0, "Product Id", ids.product_id.map(|id| format!("{:04x}", id)));
        desc.push_opt(0, "Revision Number", ids.revision.as_deref());
    }

    for config in device.configs.values() {
        describe_config(&mut desc, config);
    }

    desc
}

fn describe_config(desc: &mut Description, config: &Configuration) {
    desc.blank();
    desc.push_opt(0, "Config Number", config.config_number);
    desc.push_opt(1, "Number of Interfaces", config.num_interfaces);
    desc.push_opt(1, "Attributes", config.attributes.map(|a| format!("{:02x}", a)));
    desc.push_opt(1, "MaxPower Needed", config.max_power.as_deref());

    for interface in config.interfaces.values() {
        describe_interface(desc, interface);
    }
}

fn describe_interface(desc: &mut Description, interface: &Interface) {
    desc.blank();
    desc.push_opt(1, "Interface Number", interface.interface_number);
    desc.push_opt(2, "Name", interface.name.as_deref());
    desc.push_opt(2, "Alternate Number", interface.alternate_number);
    desc.push_opt(2, "Class", interface.class.as_deref());
    desc.push_opt(2, "Sub Class", interface.sub_class.as_deref());
    desc.push_opt(2, "Protocol", interface.protocol.as_deref());
    desc.push_opt(2, "Number of Endpoints", interface.num_endpoints);

    for endpoint in interface.endpoints.values() {
        describe_endpoint(desc, endpoint);
    }
}

fn describe_endpoint(desc: &mut Description, endpoint: &Endpoint) {
    desc.blank();
    desc.push(3, "Endpoint Address", format!("{:02x}", endpoint.address));
    desc.push(3, "Direction", endpoint.direction.to_string().to_lowercase());
    desc.push(3, "Attribute", endpoint.attribute);
    desc.push(3, "Type", endpoint.transfer_type);
    desc.push_opt(3, "Max Packet Size", endpoint.max_packet_size);
    desc.push_opt(3, "Interval", endpoint.interval.as_deref());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, TransferType, UsbSpeed};

    fn mouse() -> UsbDevice {
        let mut device = UsbDevice::new(2, 3, 1, 8);
        device.name = Some("USB Optical Mouse".to_string());
        device.manufacturer = Some("Logitech".to_string());
        device.speed = UsbSpeed::Low;
        device.ids_mut().vendor_id = Some(0x046d);
        device.ids_mut().product_id = Some(0xc00e);
        device.ids_mut().revision = Some("11.10".to_string());

        let mut interface = Interface::new(4);
        interface.interface_number = Some(0);
        interface.alternate_number = Some(0);
        interface.name = Some("usbhid".to_string());
        interface.class = Some("03(HID)".to_string());
        interface
            .endpoints
            .push(Endpoint {
                address: 0x81,
                direction: Direction::In,
                attribute: 3,
                transfer_type: TransferType::Interrupt,
                max_packet_size: Some(4),
                interval: Some("10ms".to_string()),
            })
            .unwrap();

        let mut config = Configuration::new(4);
        config.config_number = Some(1);
        config.num_interfaces = Some(1);
        config.attributes = Some(0xa0);
        config.max_power = Some("100mA".to_string());
        config.interfaces.push(interface).unwrap();
        device.configs.push(config).unwrap();
        device
    }

    #[test]
    fn test_full_description() {
        let expected = "\
USB Optical Mouse
Manufacturer: Logitech
Speed: 1.5Mb/s (low)
Vendor Id: 046d
Product Id: c00e
Revision Number: 11.10

Config Number: 1
\tNumber of Interfaces: 1
\tAttributes: a0
\tMaxPower Needed: 100mA

\tInterface Number: 0
\t\tName: usbhid
\t\tAlternate Number: 0
\t\tClass: 03(HID)

\t\t\tEndpoint Address: 81
\t\t\tDirection: in
\t\t\tAttribute: 3
\t\t\tType: Interrupt
\t\t\tMax Packet Size: 4
\t\t\tInterval: 10ms";
        assert_eq!(describe(&mouse()).to_text(), expected);
    }

    #[test]
    fn test_absent_fields_have_no_label() {
        let text = describe(&mouse()).to_text();
        assert!(!text.contains("Serial Number"));
        assert!(!text.contains("Number of Ports"));
        assert!(!text.contains("Bandwidth"));
        assert!(!text.contains("USB Version"));
        assert!(!text.contains("Sub Class"));
    }

    #[test]
    fn test_bare_device() {
        let mut device = UsbDevice::new(1, 1, 0, 8);
        device.name = Some("Unknown Device".to_string());
        device.speed = UsbSpeed::from_mbps(480);
        assert_eq!(
            describe(&device).to_string(),
            "Unknown Device\nSpeed: 480Mb/s (high)"
        );
    }

    #[test]
    fn test_hub_ports_and_bandwidth() {
        let mut device = UsbDevice::new(1, 1, 0, 8);
        device.max_children = 2;
        let bw = device.bandwidth_mut();
        bw.allocated = Some(11);
        bw.total = Some(900);
        bw.percent = Some(1);
        bw.interrupt_requests = Some(1);

        let desc = describe(&device);
        let labels: Vec<_> = desc.lines.iter().map(|l| l.label).collect();
        assert_eq!(
            labels,
            vec![
                "Speed",
                "Number of Ports",
                "Bandwidth allocated",
                "Total number of interrupt requests"
            ]
        );
        assert_eq!(desc.lines[2].value, "11 / 900 (1%)");
    }

    #[test]
    fn test_set_title() {
        let mut desc = describe(&mouse());
        desc.set_title("Desk mouse");
        assert_eq!(desc.lines[0].value, "Desk mouse");
        assert_eq!(desc.lines[1].label, "Manufacturer");

        let mut desc = describe(&UsbDevice::new(1, 1, 0, 8));
        desc.set_title("Root");
        assert_eq!(desc.to_text(), "Root\nSpeed: unknown");
    }

    #[test]
    fn test_text_capacity_covers_output() {
        let desc = describe(&mouse());
        let text = desc.to_text();
        let estimate: usize = desc.lines.iter().map(|l| l.text_len() + 1).sum();
        assert!(estimate >= text.len());
    }
}
