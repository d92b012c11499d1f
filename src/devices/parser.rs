//! Devices dump parser: reads the file and drives the record builder.

use super::builder::RecordBuilder;
use super::diagnostics::Diagnostic;
use crate::config::Limits;
use crate::model::{DeviceKey, UsbDevice, UsbForest, name_devices};
use crate::output::{Description, describe};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Where Linux exposes the dump when usbfs is mounted.
pub const DEFAULT_DEVICES_FILE: &str = "/proc/bus/usb/devices";

const VERIFY_MESSAGE: &str = "Verify that you have USB compiled into your kernel, \
have the USB core modules loaded, and have the usb filesystem mounted.";

/// Errors that stop a parse. Nothing is produced when one occurs.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Can not open {}: {source}\n{}", .path.display(), VERIFY_MESSAGE)]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("IO error reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result of one complete parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseReport {
    pub forest: UsbForest,
    /// Recoverable problems, in input order.
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseReport {
    pub fn device(&self, key: DeviceKey) -> Option<&UsbDevice> {
        self.forest.get(key)
    }

    /// Description of an attached device.
    pub fn describe(&self, key: DeviceKey) -> Option<Description> {
        self.device(key).map(describe)
    }
}

/// Parser for the line-oriented USB devices dump.
#[derive(Debug, Clone)]
pub struct DevicesParser {
    path: PathBuf,
    limits: Limits,
}

impl Default for DevicesParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DevicesParser {
    /// Parser for the default dump location.
    pub fn new() -> Self {
        Self::with_path(DEFAULT_DEVICES_FILE)
    }

    /// Parser for a custom dump path (debugfs copy, saved file, tests).
    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            limits: Limits::default(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Open and parse the dump file.
    pub fn parse(&self) -> Result<ParseReport, ParseError> {
        info!(path = %self.path.display(), "parsing USB devices dump");
        let file = File::open(&self.path).map_err(|source| ParseError::FileOpen {
            path: self.path.clone(),
            source,
        })?;
        self.parse_reader(BufReader::new(file))
            .map_err(|source| ParseError::Read {
                path: self.path.clone(),
                source,
            })
    }

    /// Parse from any buffered reader. Bytes that are not UTF-8 are replaced.
    pub fn parse_reader<R: BufRead>(&self, mut reader: R) -> io::Result<ParseReport> {
        let mut builder = RecordBuilder::new(self.limits);
        let mut buf = Vec::new();
        let mut line_no = 0;
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_no += 1;
            feed(&mut builder, line_no, &String::from_utf8_lossy(&buf));
        }
        Ok(complete(builder))
    }

    /// Parse an in-memory dump.
    pub fn parse_str(&self, text: &str) -> ParseReport {
        let mut builder = RecordBuilder::new(self.limits);
        for (n, line) in text.split_inclusive('\n').enumerate() {
            feed(&mut builder, n + 1, line);
        }
        complete(builder)
    }
}

/// Only newline-terminated lines are records.
fn feed(builder: &mut RecordBuilder, line_no: usize, line: &str) {
    if line.ends_with('\n') {
        builder.feed(line_no, line);
    } else {
        builder.truncated(line_no);
    }
}

fn complete(builder: RecordBuilder) -> ParseReport {
    let (mut forest, mut diagnostics) = builder.finish();
    // Records are closed after later lines were read; report in input order.
    diagnostics.sort_by_key(Diagnostic::line);
    name_devices(&mut forest);
    debug!(
        buses = forest.bus_count(),
        devices = forest.reachable_count(),
        orphans = forest.orphans().len(),
        diagnostics = diagnostics.len(),
        "devices dump parsed"
    );
    ParseReport {
        forest,
        diagnostics,
    }
}
