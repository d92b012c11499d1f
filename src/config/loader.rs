//! Configuration loading and management.

use crate::devices::DEFAULT_DEVICES_FILE;
use crate::model::{UNKNOWN_DEVICE, UsbDevice, UsbForest};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error in {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Application configuration.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Global settings.
    #[serde(default)]
    pub settings: Settings,

    /// Capacity bounds applied while parsing.
    #[serde(default)]
    pub limits: Limits,

    /// Bus labels by bus number (keys are strings like "1", "2", etc.).
    #[serde(default)]
    pub buses: HashMap<String, String>,

    /// Product labels by VID:PID or VID:PID:serial (e.g., "0d28:0204").
    #[serde(default)]
    pub products: HashMap<String, String>,

    /// File this configuration was read from; `None` for built-in defaults.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Global settings.
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Path of the devices dump.
    #[serde(default = "default_devices_file")]
    pub devices_file: PathBuf,

    /// Log filter used when neither RUST_LOG nor -v is given.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            devices_file: default_devices_file(),
            log_level: default_log_level(),
        }
    }
}

fn default_devices_file() -> PathBuf {
    PathBuf::from(DEFAULT_DEVICES_FILE)
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Upper bounds on the bounded slot collections of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Ports per hub (also capped by the hub's own MxCh).
    pub max_children: usize,
    /// Configurations per device.
    pub max_configs: usize,
    /// Interfaces (alternate settings included) per configuration.
    pub max_interfaces: usize,
    /// Endpoints per interface.
    pub max_endpoints: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_children: 32,
            max_configs: 8,
            max_interfaces: 32,
            max_endpoints: 16,
        }
    }
}

impl Config {
    /// Load configuration from default locations.
    /// Search order:
    /// 1. ./usbview.toml
    /// 2. ~/.config/usbview/config.toml
    /// 3. /etc/usbview.toml
    pub fn load() -> Result<Self, ConfigError> {
        let paths = Self::config_paths();

        for path in paths.into_iter().flatten() {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        // No config file found - use defaults
        Ok(Config::default())
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get list of possible config paths.
    fn config_paths() -> Vec<Option<PathBuf>> {
        vec![
            std::env::current_dir().ok().map(|p| p.join("usbview.toml")),
            dirs::config_dir().map(|p| p.join("usbview").join("config.toml")),
            Some(PathBuf::from("/etc/usbview.toml")),
        ]
    }

    /// Get label for a device, checking in priority order:
    /// 1. Product with serial (VID:PID:iSerial) - specific device
    /// 2. Product without serial (VID:PID) - all devices of this type
    pub fn device_label(&self, device: &UsbDevice) -> Option<String> {
        if let Some(label) = device.config_key().and_then(|key| self.products.get(&key)) {
            return Some(label.clone());
        }
        self.products.get(&device.vid_pid()?).cloned()
    }

    /// Get label for a bus.
    pub fn bus_label(&self, bus_num: u8) -> Option<String> {
        self.buses.get(&bus_num.to_string()).cloned()
    }

    /// Name to show for a device: configured label, else the derived name.
    pub fn display_name(&self, device: &UsbDevice) -> String {
        if device.is_bus_root()
            && let Some(label) = self.bus_label(device.bus)
        {
            return label;
        }
        self.device_label(device)
            .unwrap_or_else(|| device.display_name().to_string())
    }
}

/// Generate example configuration content.
pub fn example_config() -> &'static str {
    r#"# usbview configuration file
# Place in ./usbview.toml, ~/.config/usbview/config.toml, or /etc/usbview.toml

[settings]
# Devices dump to read (usbfs, or a copy from /sys/kernel/debug/usb/devices)
devices_file = "/proc/bus/usb/devices"
# Log filter when RUST_LOG and -v are not given: error, warn, info, debug, trace
log_level = "warn"

# Capacity bounds; entries beyond them are dropped with a diagnostic
[limits]
max_children = 32
max_configs = 8
max_interfaces = 32
max_endpoints = 16

# Bus labels (by bus number, use quoted string keys)
[buses]
# "1" = "Rear panel"
# "2" = "Front panel"

# Product labels (by VID:PID or VID:PID:serial)
# These replace the displayed name only
[products]
# "0d28:0204" = "DAPLink Debug Probe"
# "046d:c52b" = "Logitech Unifying Receiver"
"#
}

/// Generate a configuration file from a parsed device forest.
///
/// Lists every bus and every distinct non-hub product so labels can be
/// filled in by hand.
pub fn generate_config(forest: &UsbForest) -> String {
    let mut output = String::new();

    // Header
    output.push_str("# usbview configuration file - auto-generated\n");
    output.push_str("# Generated from the current USB devices dump\n");
    output.push_str("#\n");
    output.push_str("# Place in ./usbview.toml, ~/.config/usbview/config.toml, or /etc/usbview.toml\n");
    output.push_str("# Edit labels below to customize device names\n\n");

    let defaults = Settings::default();
    let limits = Limits::default();
    output.push_str("[settings]\n");
    output.push_str(&format!(
        "devices_file = \"{}\"\n",
        sanitize_toml_string(&defaults.devices_file.to_string_lossy())
    ));
    output.push_str(&format!("log_level = \"{}\"\n\n", defaults.log_level));

    output.push_str("[limits]\n");
    output.push_str(&format!("max_children = {}\n", limits.max_children));
    output.push_str(&format!("max_configs = {}\n", limits.max_configs));
    output.push_str(&format!("max_interfaces = {}\n", limits.max_interfaces));
    output.push_str(&format!("max_endpoints = {}\n\n", limits.max_endpoints));

    output.push_str("# Bus labels (by bus number)\n");
    output.push_str("[buses]\n");
    for root in forest.bus_roots() {
        output.push_str(&format!(
            "\"{}\" = \"Bus {}\"  # {}\n",
            root.bus,
            root.bus,
            root.speed.short_name()
        ));
    }
    output.push('\n');

    output.push_str("# Product labels (by VID:PID)\n");
    output.push_str("[products]\n");

    // Sorted by VID:PID, first name seen wins
    let mut products: BTreeMap<(u16, u16), String> = BTreeMap::new();
    for (_, device) in forest.walk() {
        if device.is_hub() {
            continue;
        }
        let (Some(vid), Some(pid)) = (device.vendor_id(), device.product_id()) else {
            continue;
        };
        products.entry((vid, pid)).or_insert_with(|| {
            device
                .product
                .clone()
                .or_else(|| device.manufacturer.clone())
                .unwrap_or_else(|| UNKNOWN_DEVICE.to_string())
        });
    }

    for ((vid, pid), name) in &products {
        output.push_str(&format!(
            "\"{:04x}:{:04x}\" = \"{}\"\n",
            vid,
            pid,
            sanitize_toml_string(name)
        ));
    }

    output
}

/// Sanitize a string for use as a TOML value (escape special chars).
fn sanitize_toml_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::DevicesParser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DUMP: &str = "\
T:  Bus=01 Lev=00 Prnt=00 Port=00 Cnt=00 Dev#=  1 Spd=480 MxCh= 4
D:  Ver= 2.00 Cls=09(hub  ) Sub=00 Prot=01 MxPS=64 #Cfgs=  1
P:  Vendor=1d6b ProdID=0002 Rev= 6.01
T:  Bus=01 Lev=01 Prnt=01 Port=00 Cnt=01 Dev#=  2 Spd=12  MxCh= 0
D:  Ver= 2.00 Cls=00(>ifc ) Sub=00 Prot=00 MxPS= 8 #Cfgs=  1
P:  Vendor=046d ProdID=c52b Rev=12.11
S:  Product=USB \"Receiver\"
S:  SerialNumber=ABC123
";

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(
            config.settings.devices_file,
            PathBuf::from("/proc/bus/usb/devices")
        );
        assert_eq!(config.settings.log_level, "warn");
        assert_eq!(config.limits.max_children, 32);
        assert_eq!(config.limits.max_configs, 8);
        assert_eq!(config.limits.max_interfaces, 32);
        assert_eq!(config.limits.max_endpoints, 16);
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
[settings]
devices_file = "/sys/kernel/debug/usb/devices"

[limits]
max_endpoints = 4

[products]
"046d:c52b" = "Unifying"
"#,
        )
        .unwrap();
        assert_eq!(
            config.settings.devices_file,
            PathBuf::from("/sys/kernel/debug/usb/devices")
        );
        assert_eq!(config.settings.log_level, "warn");
        assert_eq!(config.limits.max_endpoints, 4);
        assert_eq!(config.limits.max_children, 32);
        assert_eq!(config.products.len(), 1);
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config.limits, Limits::default());
        assert!(config.products.is_empty());
    }

    #[test]
    fn test_load_from_path_records_source() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[settings]\nlog_level = \"debug\"\n").unwrap();
        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.source.as_deref(), Some(file.path()));
        assert_eq!(config.settings.log_level, "debug");
        assert!(Config::default().source.is_none());
    }

    #[test]
    fn test_load_from_path_errors() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[limits]\nmax_children = \"many\"\n").unwrap();
        let err = Config::load_from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));

        let err = Config::load_from_path(Path::new("/nonexistent/usbview.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_device_label_priority() {
        let report = DevicesParser::new().parse_str(DUMP);
        let device = report
            .device(crate::model::DeviceKey::new(1, 2))
            .unwrap()
            .clone();

        let mut config = Config::default();
        assert_eq!(config.device_label(&device), None);
        assert_eq!(config.display_name(&device), "USB \"Receiver\"");

        config
            .products
            .insert("046d:c52b".to_string(), "Receiver".to_string());
        assert_eq!(config.display_name(&device), "Receiver");

        config
            .products
            .insert("046d:c52b:ABC123".to_string(), "Desk receiver".to_string());
        assert_eq!(config.display_name(&device).as_str(), "Desk receiver");
    }

    #[test]
    fn test_bus_label() {
        let report = DevicesParser::new().parse_str(DUMP);
        let root = report.forest.bus_roots().next().unwrap();

        let mut config = Config::default();
        config.buses.insert("1".to_string(), "Rear".to_string());
        assert_eq!(config.display_name(root), "Rear");
    }

    #[test]
    fn test_generate_config_round_trips() {
        let report = DevicesParser::new().parse_str(DUMP);
        let generated = generate_config(&report.forest);

        let config: Config = toml::from_str(&generated).unwrap();
        assert_eq!(config.bus_label(1).as_deref(), Some("Bus 1"));
        // Root hub is skipped.
        assert_eq!(config.products.len(), 1);
        assert_eq!(
            config.products.get("046d:c52b").map(String::as_str),
            Some("USB \"Receiver\"")
        );
    }
}
