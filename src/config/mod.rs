//! Configuration loading and management.

mod loader;

pub use loader::{Config, ConfigError, Limits, Settings, example_config, generate_config};
