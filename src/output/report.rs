//! Full text report and diagnostics listing.

use super::describe::describe;
use crate::config::Config;
use crate::devices::{Diagnostic, ParseReport};
use crate::model::UsbDevice;

/// Description of one device with its configured label as the title.
pub fn device_text(device: &UsbDevice, config: &Config) -> String {
    let mut description = describe(device);
    description.set_title(config.display_name(device));
    description.to_text()
}

/// Every reachable device description in tree order, for sharing/debugging.
pub fn render_report(report: &ParseReport, config: &Config) -> String {
    let forest = &report.forest;
    let mut output = String::new();

    output.push_str("USB Device Report\n");
    output.push_str("=================\n\n");
    output.push_str(&format!("Buses:       {}\n", forest.bus_count()));
    output.push_str(&format!("Devices:     {}\n", forest.reachable_count()));
    if !forest.orphans().is_empty() {
        output.push_str(&format!("Unattached:  {}\n", forest.orphans().len()));
    }
    // Attached records displaced by a port collision.
    let unreachable = forest.device_count().saturating_sub(forest.reachable_count());
    if unreachable > 0 {
        output.push_str(&format!("Unreachable: {}\n", unreachable));
    }
    if !report.diagnostics.is_empty() {
        output.push_str(&format!(
            "Warnings:    {} (run `usbview check` for details)\n",
            report.diagnostics.len()
        ));
    }

    for (depth, device) in forest.walk() {
        output.push_str(&format!(
            "\n--- {} {}(level {}) ---\n",
            device.key(),
            if device.is_bus_root() { "bus root " } else { "" },
            depth
        ));
        output.push_str(&device_text(device, config));
        output.push('\n');
    }

    output
}

/// One diagnostic per line, in input order.
pub fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return "No problems found\n".to_string();
    }
    let mut output = String::new();
    for diagnostic in diagnostics {
        output.push_str(&format!("warning: {}\n", diagnostic));
    }
    output.push_str(&format!("{} warning(s)\n", diagnostics.len()));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::DevicesParser;

    const DUMP: &str = "\
T:  Bus=01 Lev=00 Prnt=00 Port=00 Cnt=00 Dev#=  1 Spd=480 MxCh= 2
T:  Bus=01 Lev=01 Prnt=01 Port=00 Cnt=01 Dev#=  2 Spd=12  MxCh= 0
P:  Vendor=0781 ProdID=5567 Rev= 1.00
S:  Manufacturer=SanDisk
S:  Product=Cruzer Blade
X:  Something new
E:  Ad=81(I) Atr=02(Bulk) MxPS= 512 Ivl=0ms
";

    #[test]
    fn test_report_lists_every_device() {
        let report = DevicesParser::new().parse_str(DUMP);
        let text = render_report(&report, &Config::default());

        assert!(text.contains("Devices:     2\n"));
        assert!(text.contains("Warnings:    1"));
        assert!(text.contains("\n--- 001:001 bus root (level 0) ---\nUnknown Device\n"));
        assert!(text.contains("\n--- 001:002 (level 1) ---\nCruzer Blade\nManufacturer: SanDisk\n"));
    }

    #[test]
    fn test_report_counts_displaced_devices() {
        let dump = "\
T:  Bus=01 Lev=00 Prnt=00 Port=00 Cnt=00 Dev#=  1 Spd=480 MxCh= 2
T:  Bus=01 Lev=01 Prnt=01 Port=00 Cnt=01 Dev#=  2 Spd=12  MxCh= 0
T:  Bus=01 Lev=01 Prnt=01 Port=00 Cnt=02 Dev#=  3 Spd=12  MxCh= 0
";
        let report = DevicesParser::new().parse_str(dump);
        let text = render_report(&report, &Config::default());
        assert!(text.contains("Devices:     2\nUnreachable: 1\n"));
        assert!(!text.contains("--- 001:002"));
    }

    #[test]
    fn test_device_text_uses_label() {
        let report = DevicesParser::new().parse_str(DUMP);
        let device = report.forest.walk()[1].1;

        let mut config = Config::default();
        config
            .products
            .insert("0781:5567".to_string(), "Backup stick".to_string());
        let text = device_text(device, &config);
        assert!(text.starts_with("Backup stick\nManufacturer: SanDisk\n"));
        // The model keeps its derived name.
        assert_eq!(device.display_name(), "Cruzer Blade");
    }

    #[test]
    fn test_device_text_uses_bus_label() {
        let report = DevicesParser::new().parse_str(DUMP);
        let root = report.forest.walk()[0].1;

        let mut config = Config::default();
        config.buses.insert("1".to_string(), "Rear".to_string());
        assert!(device_text(root, &config).starts_with("Rear\nSpeed: 480Mb/s (high)\n"));
    }

    #[test]
    fn test_render_diagnostics() {
        assert_eq!(render_diagnostics(&[]), "No problems found\n");

        let report = DevicesParser::new().parse_str(DUMP);
        assert_eq!(
            render_diagnostics(&report.diagnostics),
            "warning: line 7: endpoint line outside of any interface; dropped\n1 warning(s)\n"
        );
    }
}
