//! Plain-text rendering of the device forest.

use crate::config::Config;
use crate::model::{DeviceKey, UsbDevice, UsbForest};

/// Tree listing, one section per bus, children indented under their hub.
///
/// With `verbose`, each device also lists its serial number, active
/// configuration power and endpoints.
pub fn render_tree(forest: &UsbForest, config: &Config, verbose: bool) -> String {
    let mut output = String::new();

    for (depth, device) in forest.walk() {
        if depth == 0 {
            if !output.is_empty() {
                output.push('\n');
            }
            let label = config
                .bus_label(device.bus)
                .unwrap_or_else(|| format!("Bus {}", device.bus));
            output.push_str(&format!(
                "=== {} ({}) ===\n",
                label,
                device.speed.short_name()
            ));
        }

        let indent = "  ".repeat(depth + 1);
        output.push_str(&format!("{}{}\n", indent, device_line(device, config)));

        if verbose {
            push_details(&mut output, &indent, device);
        }
    }

    let orphans = forest.orphans();
    if !orphans.is_empty() {
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str("=== Unattached ===\n");
        for device in orphans {
            // No parent, so the port number means nothing here.
            output.push_str(&format!(
                "  {} (parent {} not found)\n",
                summary(device, config, None),
                DeviceKey::new(device.bus, device.parent_number)
            ));
        }
    }

    output
}

/// One-line summary: `[port] Hub name (vid:pid) 001:004`.
pub fn device_line(device: &UsbDevice, config: &Config) -> String {
    let port = (!device.is_bus_root()).then_some(device.port);
    summary(device, config, port)
}

fn summary(device: &UsbDevice, config: &Config, port: Option<u8>) -> String {
    let port_prefix = port.map(|port| format!("[{}] ", port)).unwrap_or_default();
    let icon = if device.is_hub() { "Hub" } else { "Dev" };
    let ids = device
        .vid_pid()
        .map(|ids| format!(" ({})", ids))
        .unwrap_or_default();

    format!(
        "{}{} {}{} {}",
        port_prefix,
        icon,
        config.display_name(device),
        ids,
        device.key()
    )
}

fn push_details(output: &mut String, indent: &str, device: &UsbDevice) {
    if let Some(serial) = &device.serial_number {
        output.push_str(&format!("{}    Serial: {}\n", indent, serial));
    }
    output.push_str(&format!("{}    Speed: {}\n", indent, device.speed));

    let active = device
        .configs
        .values()
        .find(|c| c.active)
        .or_else(|| device.configs.values().next());
    let Some(config) = active else {
        return;
    };
    if let Some(power) = &config.max_power {
        output.push_str(&format!("{}    Power: {}\n", indent, power));
    }
    for interface in config.interfaces.values() {
        for ep in interface.endpoints.values() {
            output.push_str(&format!("{}    {}\n", indent, ep));
        }
    }
}
