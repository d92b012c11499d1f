//! Record builder: the state machine that turns classified lines into
//! devices and attaches them to the forest.
//!
//! Records nest Device > Config > Interface > Endpoint. A line that opens a
//! record at some level first finalizes every open record at that level or
//! deeper, innermost first, then opens the new one.

use super::diagnostics::{Diagnostic, SlotKind};
use super::fields::{self, FieldError, FieldReader};
use super::line::{ClassifiedLine, LineKind, classify};
use crate::config::Limits;
use crate::model::{AttachOutcome, Configuration, DeviceKey, Endpoint, Interface, UsbDevice, UsbForest};
use tracing::{debug, trace};

/// Which record is currently innermost-open. Ordered by nesting depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuilderState {
    Idle,
    BuildingDevice,
    BuildingConfig,
    BuildingInterface,
    BuildingEndpoint,
}

/// Incremental builder fed one complete line at a time.
#[derive(Debug)]
pub struct RecordBuilder {
    limits: Limits,
    state: BuilderState,
    /// Line currently being processed (1-based).
    line: usize,
    device: Option<UsbDevice>,
    /// Line of the `T:` record that opened `device`.
    device_line: usize,
    config: Option<Configuration>,
    config_line: usize,
    interface: Option<Interface>,
    interface_line: usize,
    endpoint: Option<Endpoint>,
    endpoint_line: usize,
    forest: UsbForest,
    diagnostics: Vec<Diagnostic>,
}

impl RecordBuilder {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            state: BuilderState::Idle,
            line: 0,
            device: None,
            device_line: 0,
            config: None,
            config_line: 0,
            interface: None,
            interface_line: 0,
            endpoint: None,
            endpoint_line: 0,
            forest: UsbForest::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// Process one newline-terminated line.
    pub fn feed(&mut self, line_no: usize, text: &str) {
        self.line = line_no;
        let line = classify(text);
        match line.kind {
            LineKind::Topology => self.start_device(line.payload),
            LineKind::Bandwidth
            | LineKind::Descriptor
            | LineKind::ProductIds
            | LineKind::Strings => self.device_field(line),
            LineKind::Config => self.start_config(line),
            LineKind::Interface => self.start_interface(line),
            LineKind::Endpoint => self.start_endpoint(line),
            LineKind::Unrecognized => {
                trace!(line = line_no, "ignoring unrecognized line");
            }
        }
    }

    /// Note an unterminated final line, which is not parsed.
    pub fn truncated(&mut self, line_no: usize) {
        self.report(Diagnostic::TruncatedLine { line: line_no });
    }

    /// End of input: finalize everything still open.
    pub fn finish(mut self) -> (UsbForest, Vec<Diagnostic>) {
        self.finalize_from(BuilderState::BuildingDevice);
        (self.forest, self.diagnostics)
    }

    fn start_device(&mut self, payload: &str) {
        self.finalize_from(BuilderState::BuildingDevice);

        let mut reader = FieldReader::new(payload);
        let record = fields::parse_topology(&mut reader);
        self.field_errors(LineKind::Topology, reader.into_errors());

        // Without a complete identity the lines up to the next T: are stray.
        if let Some(device) = record.into_device(self.limits.max_configs) {
            trace!(line = self.line, device = %device.key(), "opening device");
            self.device = Some(device);
            self.device_line = self.line;
            self.state = BuilderState::BuildingDevice;
        }
    }

    fn device_field(&mut self, line: ClassifiedLine<'_>) {
        let Some(device) = self.device.as_mut() else {
            self.stray(line.kind, "device");
            return;
        };

        let mut reader = FieldReader::new(line.payload);
        match line.kind {
            LineKind::Bandwidth => fields::read_bandwidth(&mut reader, device.bandwidth_mut()),
            LineKind::Descriptor => fields::read_descriptor(&mut reader, device.descriptor_mut()),
            LineKind::ProductIds => fields::read_product_ids(&mut reader, device.ids_mut()),
            LineKind::Strings => fields::read_string(line.payload, device),
            _ => {}
        }
        self.field_errors(line.kind, reader.into_errors());
    }

    fn start_config(&mut self, line: ClassifiedLine<'_>) {
        if self.state < BuilderState::BuildingDevice {
            self.stray(line.kind, "device");
            return;
        }
        self.finalize_from(BuilderState::BuildingConfig);

        let mut config = Configuration::new(self.limits.max_interfaces);
        config.active = line.active;
        let mut reader = FieldReader::new(line.payload);
        fields::read_config(&mut reader, &mut config);
        self.field_errors(line.kind, reader.into_errors());

        self.config = Some(config);
        self.config_line = self.line;
        self.state = BuilderState::BuildingConfig;
    }

    fn start_interface(&mut self, line: ClassifiedLine<'_>) {
        if self.state < BuilderState::BuildingConfig {
            self.stray(line.kind, "configuration");
            return;
        }
        self.finalize_from(BuilderState::BuildingInterface);

        let mut interface = Interface::new(self.limits.max_endpoints);
        interface.active = line.active;
        let mut reader = FieldReader::new(line.payload);
        fields::read_interface(&mut reader, &mut interface);
        self.field_errors(line.kind, reader.into_errors());

        self.interface = Some(interface);
        self.interface_line = self.line;
        self.state = BuilderState::BuildingInterface;
    }

    fn start_endpoint(&mut self, line: ClassifiedLine<'_>) {
        if self.state < BuilderState::BuildingInterface {
            self.stray(line.kind, "interface");
            return;
        }
        self.finalize_from(BuilderState::BuildingEndpoint);

        let mut reader = FieldReader::new(line.payload);
        let endpoint = fields::parse_endpoint(&mut reader);
        self.field_errors(line.kind, reader.into_errors());

        if let Some(endpoint) = endpoint {
            self.endpoint = Some(endpoint);
            self.endpoint_line = self.line;
            self.state = BuilderState::BuildingEndpoint;
        }
    }

    /// Close open records from the innermost out to `level` inclusive.
    fn finalize_from(&mut self, level: BuilderState) {
        while self.state >= level {
            match self.state {
                BuilderState::BuildingEndpoint => self.close_endpoint(),
                BuilderState::BuildingInterface => self.close_interface(),
                BuilderState::BuildingConfig => self.close_config(),
                BuilderState::BuildingDevice => self.close_device(),
                BuilderState::Idle => break,
            }
        }
    }

    fn close_endpoint(&mut self) {
        self.state = BuilderState::BuildingInterface;
        let owner = self.owner(Some("interface"));
        let line = self.endpoint_line;
        let (Some(endpoint), Some(interface)) = (self.endpoint.take(), self.interface.as_mut()) else {
            return;
        };
        if let Err(err) = interface.endpoints.push(endpoint) {
            self.capacity_exceeded(line, SlotKind::Endpoint, owner, err.index, err.capacity);
        }
    }

    fn close_interface(&mut self) {
        self.state = BuilderState::BuildingConfig;
        let owner = self.owner(Some("configuration"));
        let line = self.interface_line;
        let (Some(interface), Some(config)) = (self.interface.take(), self.config.as_mut()) else {
            return;
        };
        if let Err(err) = config.interfaces.push(interface) {
            self.capacity_exceeded(line, SlotKind::Interface, owner, err.index, err.capacity);
        }
    }

    fn close_config(&mut self) {
        self.state = BuilderState::BuildingDevice;
        let owner = self.owner(None);
        let line = self.config_line;
        let (Some(config), Some(device)) = (self.config.take(), self.device.as_mut()) else {
            return;
        };
        if let Err(err) = device.configs.push(config) {
            self.capacity_exceeded(line, SlotKind::Config, owner, err.index, err.capacity);
        }
    }

    fn close_device(&mut self) {
        self.state = BuilderState::Idle;
        let Some(device) = self.device.take() else {
            return;
        };
        let key = device.key();
        let line = self.device_line;
        // Bus roots hang off the synthetic root (000:000) by bus number.
        let (parent, port) = match device.parent_key() {
            Some(parent) => (parent, usize::from(device.port)),
            None => (DeviceKey::new(0, 0), usize::from(device.bus)),
        };

        match self.forest.attach(device, self.limits.max_children) {
            AttachOutcome::Attached {
                displaced,
                duplicate,
            } => {
                if duplicate {
                    self.report(Diagnostic::DuplicateDevice { line, device: key });
                }
                if let Some(replaced) = displaced {
                    self.report(Diagnostic::PortCollision {
                        line,
                        device: key,
                        replaced,
                        parent,
                        port,
                    });
                }
            }
            AttachOutcome::Orphaned { parent } => {
                self.report(Diagnostic::OrphanDevice {
                    line,
                    device: key,
                    parent,
                });
            }
            AttachOutcome::NoCapacity {
                parent,
                port,
                capacity,
            } => {
                let owner = match parent {
                    Some(parent) => format!("device {}", parent),
                    None => "bus list".to_string(),
                };
                self.report(Diagnostic::CapacityExceeded {
                    line,
                    kind: SlotKind::Port,
                    owner,
                    index: port,
                    capacity,
                });
            }
        }
    }

    /// Human-readable owner of a record: the open device itself, or the
    /// open `record` inside it.
    fn owner(&self, record: Option<&str>) -> String {
        let device = match &self.device {
            Some(device) => format!("device {}", device.key()),
            None => "device".to_string(),
        };
        match record {
            Some(record) => format!("{} of {}", record, device),
            None => device,
        }
    }

    /// `line` is where the dropped record started, not where it was closed.
    fn capacity_exceeded(
        &mut self,
        line: usize,
        kind: SlotKind,
        owner: String,
        index: usize,
        capacity: usize,
    ) {
        self.report(Diagnostic::CapacityExceeded {
            line,
            kind,
            owner,
            index,
            capacity,
        });
    }

    fn stray(&mut self, kind: LineKind, expected: &'static str) {
        self.report(Diagnostic::StrayRecord {
            line: self.line,
            record: kind.name(),
            expected,
        });
    }

    fn field_errors(&mut self, kind: LineKind, errors: Vec<FieldError>) {
        for error in errors {
            let diagnostic = match error {
                FieldError::Malformed { field, value } => Diagnostic::MalformedField {
                    line: self.line,
                    record: kind.name(),
                    field,
                    value,
                },
                FieldError::Missing { field } => Diagnostic::MissingField {
                    line: self.line,
                    record: kind.name(),
                    field,
                },
            };
            self.report(diagnostic);
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        debug!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }
}
