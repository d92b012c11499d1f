//! Non-fatal problems found while parsing a devices dump.

use crate::model::DeviceKey;
use thiserror::Error;

/// Kind of bounded collection that overflowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Port,
    Config,
    Interface,
    Endpoint,
}

impl std::fmt::Display for SlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SlotKind::Port => "port",
            SlotKind::Config => "configuration",
            SlotKind::Interface => "interface",
            SlotKind::Endpoint => "endpoint",
        };
        write!(f, "{}", name)
    }
}

/// A recoverable parse problem. Parsing always continues past these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("line {line}: malformed {record} field {field}={value:?}")]
    MalformedField {
        line: usize,
        record: &'static str,
        field: String,
        value: String,
    },
    #[error("line {line}: {record} line is missing {field}")]
    MissingField {
        line: usize,
        record: &'static str,
        field: String,
    },
    /// A continuation record with no open record to belong to.
    #[error("line {line}: {record} line outside of any {expected}; dropped")]
    StrayRecord {
        line: usize,
        record: &'static str,
        expected: &'static str,
    },
    #[error("line {line}: device {device} has no parent device {parent}; unreachable")]
    OrphanDevice {
        line: usize,
        device: DeviceKey,
        parent: DeviceKey,
    },
    #[error("line {line}: {kind} slot {index} of {owner} exceeds capacity {capacity}; dropped")]
    CapacityExceeded {
        line: usize,
        kind: SlotKind,
        owner: String,
        index: usize,
        capacity: usize,
    },
    #[error("line {line}: device {device} replaced {replaced} on port {port} of {parent}")]
    PortCollision {
        line: usize,
        device: DeviceKey,
        replaced: DeviceKey,
        parent: DeviceKey,
        port: usize,
    },
    #[error("line {line}: device {device} was already defined; previous record replaced")]
    DuplicateDevice { line: usize, device: DeviceKey },
    #[error("line {line}: incomplete final line ignored")]
    TruncatedLine { line: usize },
}

impl Diagnostic {
    /// Line the problem was reported against (1-based).
    pub fn line(&self) -> usize {
        match self {
            Diagnostic::MalformedField { line, .. }
            | Diagnostic::MissingField { line, .. }
            | Diagnostic::StrayRecord { line, .. }
            | Diagnostic::OrphanDevice { line, .. }
            | Diagnostic::CapacityExceeded { line, .. }
            | Diagnostic::PortCollision { line, .. }
            | Diagnostic::DuplicateDevice { line, .. }
            | Diagnostic::TruncatedLine { line } => *line,
        }
    }
}
