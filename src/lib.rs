//! USB Device Viewer
//!
//! A library and CLI tool for browsing the device tree recorded in the Linux
//! usb devices dump (`/proc/bus/usb/devices`).

pub mod config;
pub mod devices;
pub mod logging;
pub mod model;
pub mod output;
pub mod session;
pub mod ui;

pub use config::Config;
pub use devices::{DevicesParser, ParseError, ParseReport};
pub use model::{DeviceKey, UsbDevice, UsbForest, UsbSpeed};
pub use session::Session;
