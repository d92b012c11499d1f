//! Tracing subscriber setup for the binary.

use thiserror::Error;
use tracing_subscriber::{
    EnvFilter, filter::ParseError, fmt, layer::SubscriberExt, util::SubscriberInitExt,
    util::TryInitError,
};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{directive}': {source}")]
    Filter {
        directive: String,
        #[source]
        source: ParseError,
    },
    #[error("logging already initialized: {0}")]
    Init(#[from] TryInitError),
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Discard everything, while the terminal UI owns the screen.
    Sink,
}

/// Filter directive from the `-v` count, falling back to the configured level.
pub fn filter_directive(verbose: u8, configured: &str) -> &str {
    match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. `RUST_LOG`, when set, wins over both
/// `verbose` and `configured`.
pub fn init(verbose: u8, configured: &str, target: LogTarget) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let directive = filter_directive(verbose, configured);
            EnvFilter::try_new(directive).map_err(|source| LoggingError::Filter {
                directive: directive.to_string(),
                source,
            })?
        }
    };

    match target {
        LogTarget::Stderr => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()?,
        LogTarget::Sink => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::sink))
            .try_init()?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive(0, "warn"), "warn");
        assert_eq!(filter_directive(1, "warn"), "debug");
        assert_eq!(filter_directive(2, "warn"), "trace");
        assert_eq!(filter_directive(5, "info"), "trace");
    }
}
