//! Owned reload context: the dump source and the latest parse of it.

use crate::devices::{DevicesParser, ParseError, ParseReport};
use std::path::Path;
use tracing::{info, warn};

/// One viewer session over a devices dump.
///
/// `reload` takes `&mut self` and queries take `&self`, so a parse never
/// overlaps with a reader of the previous forest.
#[derive(Debug)]
pub struct Session {
    parser: DevicesParser,
    report: Option<ParseReport>,
}

impl Session {
    /// Create a session. Nothing is parsed until [`Session::reload`].
    pub fn new(parser: DevicesParser) -> Self {
        Self {
            parser,
            report: None,
        }
    }

    pub fn source(&self) -> &Path {
        self.parser.path()
    }

    /// Discard the current forest and parse the source again.
    ///
    /// On failure the session is left empty.
    pub fn reload(&mut self) -> Result<&ParseReport, ParseError> {
        self.report = None;
        match self.parser.parse() {
            Ok(report) => {
                info!(
                    devices = report.forest.reachable_count(),
                    diagnostics = report.diagnostics.len(),
                    "reloaded {}",
                    self.parser.path().display()
                );
                Ok(&*self.report.insert(report))
            }
            Err(err) => {
                warn!("{}", err);
                Err(err)
            }
        }
    }

    /// The latest successful parse, if any.
    pub fn report(&self) -> Option<&ParseReport> {
        self.report.as_ref()
    }

    /// Drop the current forest.
    pub fn discard(&mut self) {
        self.report = None;
    }

    /// Hand over the latest parse, leaving the session empty.
    pub fn take_report(&mut self) -> Option<ParseReport> {
        self.report.take()
    }
}
