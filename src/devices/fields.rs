//! Typed field extraction from classified record lines.
//!
//! Payloads are `key=value` lists with values padded for alignment, e.g.
//! `Bus=01 Lev=00 Prnt=00 Port=00 Cnt=00 Dev#=  1 Spd=12  MxCh= 2`.
//! A key is the run of non-blank characters before `=`; its value runs up to
//! the next key. Unknown keys are ignored. Bad values are collected as
//! [`FieldError`]s and leave the field unset.

use crate::model::{
    Bandwidth, Configuration, DeviceDescriptor, Direction, Endpoint, Interface, ProductIds,
    TransferType, UsbDevice, UsbSpeed,
};
use thiserror::Error;

/// A field that could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// Value present but not parseable.
    #[error("malformed field {field}={value:?}")]
    Malformed { field: String, value: String },
    /// Required key absent.
    #[error("missing field {field}")]
    Missing { field: String },
}

/// Key/value view over one payload, collecting errors as fields are read.
#[derive(Debug)]
pub struct FieldReader<'a> {
    pairs: Vec<(&'a str, &'a str)>,
    errors: Vec<FieldError>,
}

impl<'a> FieldReader<'a> {
    pub fn new(payload: &'a str) -> Self {
        Self {
            pairs: split_pairs(payload),
            errors: Vec::new(),
        }
    }

    /// Raw trimmed value of `key`; empty values count as absent.
    pub fn raw(&self, key: &str) -> Option<&'a str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .filter(|v| !v.is_empty())
    }

    /// Raw value, recording a [`FieldError::Missing`] if absent.
    pub fn require(&mut self, key: &str) -> Option<&'a str> {
        let value = self.raw(key);
        if value.is_none() {
            self.errors.push(FieldError::Missing {
                field: key.to_string(),
            });
        }
        value
    }

    /// Text value with runs of blanks collapsed, e.g. `09(hub  )` -> `09(hub)`.
    pub fn text(&self, key: &str) -> Option<String> {
        self.raw(key).map(normalize)
    }

    /// Decimal integer field.
    pub fn dec<T: TryFrom<u32>>(&mut self, key: &str) -> Option<T> {
        let value = self.raw(key)?;
        self.number(key, value, 10)
    }

    /// Hexadecimal integer field.
    pub fn hex<T: TryFrom<u32>>(&mut self, key: &str) -> Option<T> {
        let value = self.raw(key)?;
        self.number(key, value, 16)
    }

    /// Parse `value` (belonging to `key`) in the given radix.
    pub fn number<T: TryFrom<u32>>(&mut self, key: &str, value: &str, radix: u32) -> Option<T> {
        let parsed = u32::from_str_radix(value.trim(), radix)
            .ok()
            .and_then(|n| T::try_from(n).ok());
        if parsed.is_none() {
            self.malformed(key, value);
        }
        parsed
    }

    pub fn malformed(&mut self, key: &str, value: &str) {
        self.errors.push(FieldError::Malformed {
            field: key.to_string(),
            value: value.to_string(),
        });
    }

    /// Errors recorded so far.
    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }
}

fn split_pairs(payload: &str) -> Vec<(&str, &str)> {
    // (key start, position of '=')
    let mut keys: Vec<(usize, usize)> = Vec::new();
    for (eq, _) in payload.match_indices('=') {
        let start = payload[..eq]
            .rfind(|c: char| c.is_ascii_whitespace() || c == ',')
            .map(|p| p + 1)
            .unwrap_or(0);
        let after_previous = keys.last().is_none_or(|&(_, prev_eq)| start > prev_eq);
        if start < eq && after_previous {
            keys.push((start, eq));
        }
    }

    keys.iter()
        .enumerate()
        .map(|(n, &(start, eq))| {
            let end = keys
                .get(n + 1)
                .map(|&(next, _)| next)
                .unwrap_or(payload.len());
            let value = payload[eq + 1..end].trim().trim_end_matches(',').trim_end();
            (&payload[start..eq], value)
        })
        .collect()
}

fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace("( ", "(")
        .replace(" )", ")")
}

/// Split `81(I)` into `("81", Some("I"))`.
fn split_tag(value: &str) -> (&str, Option<&str>) {
    match value.split_once('(') {
        Some((head, rest)) => (head.trim(), Some(rest.trim_end_matches(')').trim())),
        None => (value.trim(), None),
    }
}

/// Identity fields of a `T:` line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyRecord {
    pub bus: Option<u8>,
    pub level: Option<u8>,
    pub parent: Option<u8>,
    pub port: Option<u8>,
    pub device: Option<u8>,
    pub speed: Option<UsbSpeed>,
    pub max_children: Option<u8>,
}

impl TopologyRecord {
    /// Build the device record this line introduces, if its identity is complete.
    pub fn into_device(self, max_configs: usize) -> Option<UsbDevice> {
        let mut device = UsbDevice::new(self.bus?, self.device?, self.parent?, max_configs);
        device.level = self.level;
        device.port = self.port.unwrap_or(0);
        device.speed = self.speed.unwrap_or_default();
        device.max_children = self.max_children.unwrap_or(0);
        Some(device)
    }
}

/// `T:  Bus=01 Lev=00 Prnt=00 Port=00 Cnt=00 Dev#=  1 Spd=12  MxCh= 2`
pub fn parse_topology(reader: &mut FieldReader<'_>) -> TopologyRecord {
    let speed = reader.raw("Spd").and_then(|raw| {
        let speed = UsbSpeed::from_field(raw);
        if speed.is_none() {
            reader.malformed("Spd", raw);
        }
        speed
    });

    let bus = reader.require("Bus").and_then(|v| reader.number("Bus", v, 10));
    let device = reader
        .require("Dev#")
        .and_then(|v| reader.number("Dev#", v, 10));
    let parent = reader
        .require("Prnt")
        .and_then(|v| reader.number("Prnt", v, 10));

    TopologyRecord {
        bus,
        level: reader.dec("Lev"),
        parent,
        port: reader.dec("Port"),
        device,
        speed,
        max_children: reader.dec("MxCh"),
    }
}

/// `B:  Alloc=  0/900 us ( 0%), #Int=  0, #Iso=  0`
pub fn read_bandwidth(reader: &mut FieldReader<'_>, bandwidth: &mut Bandwidth) {
    if let Some(alloc) = reader.raw("Alloc") {
        match parse_alloc(alloc) {
            Some((allocated, total, percent)) => {
                bandwidth.allocated = Some(allocated);
                bandwidth.total = Some(total);
                bandwidth.percent = percent;
            }
            None => reader.malformed("Alloc", alloc),
        }
    }
    if let Some(n) = reader.dec("#Int") {
        bandwidth.interrupt_requests = Some(n);
    }
    if let Some(n) = reader.dec("#Iso") {
        bandwidth.isochronous_requests = Some(n);
    }
}

/// `  0/900 us ( 0%)` -> (0, 900, Some(0))
fn parse_alloc(value: &str) -> Option<(u32, u32, Option<u32>)> {
    let (allocated, rest) = value.split_once('/')?;
    let allocated = allocated.trim().parse().ok()?;
    let total = rest.split_whitespace().next()?.parse().ok()?;
    let percent = rest
        .split_once('(')
        .and_then(|(_, p)| p.split_once('%'))
        .and_then(|(p, _)| p.trim().parse().ok());
    Some((allocated, total, percent))
}

/// `D:  Ver= 1.10 Cls=09(hub  ) Sub=00 Prot=00 MxPS= 8 #Cfgs=  1`
pub fn read_descriptor(reader: &mut FieldReader<'_>, descriptor: &mut DeviceDescriptor) {
    if let Some(v) = reader.text("Ver") {
        descriptor.usb_version = Some(v);
    }
    if let Some(v) = reader.text("Cls") {
        descriptor.class = Some(v);
    }
    if let Some(v) = reader.text("Sub") {
        descriptor.sub_class = Some(v);
    }
    if let Some(v) = reader.text("Prot") {
        descriptor.protocol = Some(v);
    }
    if let Some(v) = reader.dec("MxPS") {
        descriptor.max_packet_size = Some(v);
    }
    if let Some(v) = reader.dec("#Cfgs") {
        descriptor.num_configurations = Some(v);
    }
}

/// `P:  Vendor=0000 ProdID=0000 Rev= 2.06`
pub fn read_product_ids(reader: &mut FieldReader<'_>, ids: &mut ProductIds) {
    if let Some(v) = reader.hex("Vendor") {
        ids.vendor_id = Some(v);
    }
    if let Some(v) = reader.hex("ProdID") {
        ids.product_id = Some(v);
    }
    if let Some(v) = reader.text("Rev") {
        ids.revision = Some(v);
    }
}

/// `S:  Product=UHCI Host Controller`
///
/// Values are free text and may contain `=`, so only the first `=` splits.
pub fn read_string(payload: &str, device: &mut UsbDevice) {
    let Some((key, value)) = payload.split_once('=') else {
        return;
    };
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    let slot = match key.trim() {
        "Manufacturer" => &mut device.manufacturer,
        "Product" => &mut device.product,
        "SerialNumber" => &mut device.serial_number,
        _ => return,
    };
    *slot = Some(value.to_string());
}

/// `C:* #Ifs= 1 Cfg#= 1 Atr=e0 MxPwr=100mA`
pub fn read_config(reader: &mut FieldReader<'_>, config: &mut Configuration) {
    config.num_interfaces = reader.dec("#Ifs");
    config.config_number = reader.dec("Cfg#");
    config.attributes = reader.hex("Atr");
    config.max_power = reader.text("MxPwr");
}

/// `I:* If#= 0 Alt= 0 #EPs= 1 Cls=09(hub  ) Sub=00 Prot=00 Driver=hub`
pub fn read_interface(reader: &mut FieldReader<'_>, interface: &mut Interface) {
    interface.interface_number = reader.dec("If#");
    interface.alternate_number = reader.dec("Alt");
    interface.num_endpoints = reader.dec("#EPs");
    interface.class = reader.text("Cls");
    interface.sub_class = reader.text("Sub");
    interface.protocol = reader.text("Prot");
    interface.name = reader.text("Driver").filter(|d| d != "(none)");
}

/// `E:  Ad=81(I) Atr=03(Int.) MxPS=   2 Ivl=255ms`
///
/// `Ad` and `Atr` are required; without them there is no endpoint.
pub fn parse_endpoint(reader: &mut FieldReader<'_>) -> Option<Endpoint> {
    let address_raw = reader.require("Ad");
    let attribute_raw = reader.require("Atr");

    let (address_hex, direction_tag) = split_tag(address_raw?);
    let (attribute_hex, type_tag) = split_tag(attribute_raw?);
    let address: u8 = reader.number("Ad", address_hex, 16)?;
    let attribute: u8 = reader.number("Atr", attribute_hex, 16)?;

    Some(Endpoint {
        address,
        direction: direction_tag
            .and_then(Direction::from_dump)
            .unwrap_or_else(|| Direction::from_address(address)),
        attribute,
        transfer_type: type_tag
            .and_then(TransferType::from_dump)
            .unwrap_or_else(|| TransferType::from_attributes(attribute)),
        max_packet_size: reader.dec("MxPS"),
        interval: reader.text("Ivl"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pairs_padded_values() {
        let pairs = split_pairs("  Bus=01 Lev=00 Prnt=00 Port=00 Cnt=00 Dev#=  1 Spd=12  MxCh= 2");
        assert_eq!(
            pairs,
            vec![
                ("Bus", "01"),
                ("Lev", "00"),
                ("Prnt", "00"),
                ("Port", "00"),
                ("Cnt", "00"),
                ("Dev#", "1"),
                ("Spd", "12"),
                ("MxCh", "2"),
            ]
        );
    }

    #[test]
    fn test_split_pairs_commas_and_spaces_in_values() {
        let pairs = split_pairs("  Alloc=  0/900 us ( 0%), #Int=  1, #Iso=  0");
        assert_eq!(
            pairs,
            vec![("Alloc", "0/900 us ( 0%)"), ("#Int", "1"), ("#Iso", "0")]
        );
    }

    #[test]
    fn test_topology() {
        let mut reader =
            FieldReader::new("  Bus=02 Lev=01 Prnt=01 Port=03 Cnt=01 Dev#=  5 Spd=1.5 MxCh= 0");
        let record = parse_topology(&mut reader);
        assert!(reader.into_errors().is_empty());
        assert_eq!(
            record,
            TopologyRecord {
                bus: Some(2),
                level: Some(1),
                parent: Some(1),
                port: Some(3),
                device: Some(5),
                speed: Some(UsbSpeed::Low),
                max_children: Some(0),
            }
        );
        let device = record.into_device(8).unwrap();
        assert_eq!(device.port, 3);
        assert_eq!(device.speed, UsbSpeed::Low);
    }

    #[test]
    fn test_topology_missing_identity() {
        let mut reader = FieldReader::new("  Bus=02 Lev=01 Prnt=01 Port=03 Spd=12");
        let record = parse_topology(&mut reader);
        assert_eq!(
            reader.into_errors(),
            vec![FieldError::Missing {
                field: "Dev#".to_string()
            }]
        );
        assert!(record.into_device(8).is_none());
    }

    #[test]
    fn test_malformed_field_is_skipped() {
        let mut reader = FieldReader::new("  Bus=zz Dev#=  1 Prnt=00 Spd=12 MxCh=300");
        let record = parse_topology(&mut reader);
        assert_eq!(record.bus, None);
        assert_eq!(record.device, Some(1));
        assert_eq!(record.max_children, None);
        let errors = reader.into_errors();
        assert_eq!(errors[0].to_string(), "malformed field Bus=\"zz\"");
        assert_eq!(
            errors,
            vec![
                FieldError::Malformed {
                    field: "Bus".to_string(),
                    value: "zz".to_string()
                },
                FieldError::Malformed {
                    field: "MxCh".to_string(),
                    value: "300".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_bandwidth() {
        let mut reader = FieldReader::new("  Alloc= 23/900 us ( 3%), #Int=  2, #Iso=  0");
        let mut bandwidth = Bandwidth::default();
        read_bandwidth(&mut reader, &mut bandwidth);
        assert_eq!(
            bandwidth,
            Bandwidth {
                allocated: Some(23),
                total: Some(900),
                percent: Some(3),
                interrupt_requests: Some(2),
                isochronous_requests: Some(0),
            }
        );
    }

    #[test]
    fn test_descriptor_and_ids() {
        let mut reader = FieldReader::new("  Ver= 1.10 Cls=09(hub  ) Sub=00 Prot=00 MxPS= 8 #Cfgs=  1");
        let mut descriptor = DeviceDescriptor::default();
        read_descriptor(&mut reader, &mut descriptor);
        assert_eq!(descriptor.usb_version.as_deref(), Some("1.10"));
        assert_eq!(descriptor.class.as_deref(), Some("09(hub)"));
        assert_eq!(descriptor.max_packet_size, Some(8));
        assert_eq!(descriptor.num_configurations, Some(1));

        let mut reader = FieldReader::new("  Vendor=046d ProdID=c52b Rev=12.03");
        let mut ids = ProductIds::default();
        read_product_ids(&mut reader, &mut ids);
        assert_eq!(ids.vendor_id, Some(0x046d));
        assert_eq!(ids.product_id, Some(0xc52b));
        assert_eq!(ids.revision.as_deref(), Some("12.03"));
    }

    #[test]
    fn test_strings() {
        let mut device = UsbDevice::new(1, 1, 0, 8);
        read_string("  Manufacturer=Linux 6.1.0 ehci_hcd", &mut device);
        read_string("  Product=Key=Value Gadget ", &mut device);
        read_string("  SerialNumber=0000:00:1d.0", &mut device);
        read_string("  Unknown=ignored", &mut device);
        read_string("  Product=", &mut device);
        assert_eq!(device.manufacturer.as_deref(), Some("Linux 6.1.0 ehci_hcd"));
        assert_eq!(device.product.as_deref(), Some("Key=Value Gadget"));
        assert_eq!(device.serial_number.as_deref(), Some("0000:00:1d.0"));
    }

    #[test]
    fn test_config_and_interface() {
        let mut reader = FieldReader::new(" #Ifs= 2 Cfg#= 1 Atr=a0 MxPwr= 98mA");
        let mut config = Configuration::new(8);
        read_config(&mut reader, &mut config);
        assert_eq!(config.num_interfaces, Some(2));
        assert_eq!(config.config_number, Some(1));
        assert_eq!(config.attributes, Some(0xa0));
        assert_eq!(config.max_power.as_deref(), Some("98mA"));

        let mut reader =
            FieldReader::new("  If#= 1 Alt= 0 #EPs= 1 Cls=03(HID  ) Sub=00 Prot=02 Driver=(none)");
        let mut interface = Interface::new(8);
        read_interface(&mut reader, &mut interface);
        assert_eq!(interface.interface_number, Some(1));
        assert_eq!(interface.class.as_deref(), Some("03(HID)"));
        assert_eq!(interface.protocol.as_deref(), Some("02"));
        assert_eq!(interface.name, None);
    }

    #[test]
    fn test_endpoint() {
        let mut reader = FieldReader::new("  Ad=81(I) Atr=03(Int.) MxPS=   8 Ivl=10ms");
        let ep = parse_endpoint(&mut reader).unwrap();
        assert_eq!(ep.address, 0x81);
        assert_eq!(ep.direction, Direction::In);
        assert_eq!(ep.attribute, 3);
        assert_eq!(ep.transfer_type, TransferType::Interrupt);
        assert_eq!(ep.max_packet_size, Some(8));
        assert_eq!(ep.interval.as_deref(), Some("10ms"));
    }

    #[test]
    fn test_endpoint_without_tags_uses_bits() {
        let mut reader = FieldReader::new("  Ad=02 Atr=02 MxPS= 512");
        let ep = parse_endpoint(&mut reader).unwrap();
        assert_eq!(ep.direction, Direction::Out);
        assert_eq!(ep.transfer_type, TransferType::Bulk);
        assert_eq!(ep.interval, None);
    }

    #[test]
    fn test_endpoint_bad_address() {
        let mut reader = FieldReader::new("  Ad=xyz(I) Atr=03(Int.)");
        assert!(parse_endpoint(&mut reader).is_none());
        assert_eq!(reader.into_errors().len(), 1);
    }
}
