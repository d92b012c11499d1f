//! Parsing of the `/proc/bus/usb/devices` dump format.

pub mod builder;
pub mod diagnostics;
pub mod fields;
pub mod line;
pub mod parser;

pub use builder::{BuilderState, RecordBuilder};
pub use diagnostics::{Diagnostic, SlotKind};
pub use line::{ClassifiedLine, LineKind, classify};
pub use parser::{DEFAULT_DEVICES_FILE, DevicesParser, ParseError, ParseReport};
