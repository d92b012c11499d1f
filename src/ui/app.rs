//! TUI application state.

use crate::config::Config;
use crate::model::{DeviceKey, ROOT_NAME, UsbDevice, UsbForest};
use crate::output::device_text;
use crate::session::Session;
use std::collections::HashSet;

/// Expansion key of the synthetic root row.
const ROOT_KEY: DeviceKey = DeviceKey { bus: 0, device: 0 };

/// TUI application state.
pub struct App {
    /// Source file and latest parse.
    pub session: Session,
    /// Configuration.
    pub config: Config,
    /// Currently selected item index.
    pub selected: usize,
    /// Scroll offset of the description panel.
    pub detail_scroll: u16,
    /// Expanded nodes (collapsed if not in set).
    pub expanded: HashSet<DeviceKey>,
    /// Show help overlay.
    pub show_help: bool,
    /// Last reload failure, shown instead of the tree.
    pub error: Option<String>,
    /// Temporary status message to display.
    pub status_message: Option<(String, std::time::Instant)>,
}

impl App {
    /// Create an app over a session. Everything starts expanded.
    pub fn new(session: Session, config: Config) -> Self {
        let mut app = Self {
            session,
            config,
            selected: 0,
            detail_scroll: 0,
            expanded: HashSet::new(),
            show_help: false,
            error: None,
            status_message: None,
        };
        app.expand_all();
        app
    }

    fn forest(&self) -> Option<&UsbForest> {
        self.session.report().map(|report| &report.forest)
    }

    /// Re-read the dump, keeping the selected device selected if it is still there.
    pub fn reload(&mut self) {
        let previous = self.selected_key();
        match self.session.reload() {
            Ok(report) => {
                let message = format!(
                    "Reloaded: {} devices, {} warnings",
                    report.forest.reachable_count(),
                    report.diagnostics.len()
                );
                self.error = None;
                self.set_status(message);
            }
            Err(err) => {
                self.error = Some(err.to_string());
            }
        }

        // Newly appeared hubs start expanded.
        if let Some(forest) = self.forest() {
            let keys: Vec<_> = forest
                .walk()
                .iter()
                .filter(|(_, d)| !d.children.is_empty())
                .map(|(_, d)| d.key())
                .collect();
            self.expanded.extend(keys);
        }

        let items = self.visible_items();
        self.selected = previous
            .and_then(|key| items.iter().position(|item| item.key() == key))
            .unwrap_or(0);
        self.detail_scroll = 0;
    }

    /// Set a status message (auto-clears after a few seconds).
    pub fn set_status(&mut self, msg: String) {
        self.status_message = Some((msg, std::time::Instant::now()));
    }

    /// Get current status message if not expired.
    pub fn status(&self) -> Option<&str> {
        self.status_message.as_ref().and_then(|(msg, time)| {
            if time.elapsed().as_secs() < 3 {
                Some(msg.as_str())
            } else {
                None
            }
        })
    }

    /// Toggle expansion of selected item.
    pub fn toggle_expand(&mut self) {
        let items = self.visible_items();
        if let Some(item) = items.get(self.selected)
            && item.has_children()
        {
            let key = item.key();
            if !self.expanded.remove(&key) {
                self.expanded.insert(key);
            }
        }
    }

    /// Expand everything, or collapse to the bus list if already fully expanded.
    pub fn toggle_expand_all(&mut self) {
        let expandable = self.expandable_keys();
        if expandable.iter().all(|key| self.expanded.contains(key)) {
            self.expanded.clear();
            self.expanded.insert(ROOT_KEY);
        } else {
            self.expanded.extend(expandable);
        }
        let len = self.visible_items().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn expand_all(&mut self) {
        let expandable = self.expandable_keys();
        self.expanded.extend(expandable);
    }

    fn expandable_keys(&self) -> Vec<DeviceKey> {
        let mut keys = vec![ROOT_KEY];
        if let Some(forest) = self.forest() {
            keys.extend(
                forest
                    .walk()
                    .iter()
                    .filter(|(_, d)| !d.children.is_empty())
                    .map(|(_, d)| d.key()),
            );
        }
        keys
    }

    /// Move selection up/down.
    pub fn move_selection(&mut self, delta: i32) {
        let len = self.visible_items().len();
        if len == 0 {
            return;
        }

        let new_selected = if delta < 0 {
            self.selected.saturating_sub(delta.unsigned_abs() as usize)
        } else {
            (self.selected + delta as usize).min(len - 1)
        };

        if new_selected != self.selected {
            self.selected = new_selected;
            self.detail_scroll = 0;
        }
    }

    /// Jump to top.
    pub fn goto_top(&mut self) {
        self.selected = 0;
        self.detail_scroll = 0;
    }

    /// Jump to bottom.
    pub fn goto_bottom(&mut self) {
        let len = self.visible_items().len();
        self.selected = len.saturating_sub(1);
        self.detail_scroll = 0;
    }

    /// Scroll the description panel by `delta` lines.
    pub fn scroll_details(&mut self, delta: i32) {
        let max = self.details_text().lines().count().saturating_sub(1);
        let max = u16::try_from(max).unwrap_or(u16::MAX);
        self.detail_scroll = if delta < 0 {
            self.detail_scroll
                .saturating_sub(u16::try_from(delta.unsigned_abs()).unwrap_or(u16::MAX))
        } else {
            self.detail_scroll
                .saturating_add(u16::try_from(delta).unwrap_or(u16::MAX))
                .min(max)
        };
    }

    /// Is item expanded?
    pub fn is_expanded(&self, key: DeviceKey) -> bool {
        self.expanded.contains(&key)
    }

    /// Get visible tree items based on expansion state.
    pub fn visible_items(&self) -> Vec<TreeItem> {
        let Some(forest) = self.forest() else {
            return Vec::new();
        };

        let mut items = vec![TreeItem::Root {
            label: ROOT_NAME.to_string(),
            bus_count: forest.bus_count(),
        }];
        if self.is_expanded(ROOT_KEY) {
            let mut seen = HashSet::new();
            for bus_root in forest.bus_roots() {
                self.add_device_items(forest, &mut items, bus_root, 1, &mut seen);
            }
        }
        items
    }

    /// Add a device and, if expanded, its subtree.
    fn add_device_items(
        &self,
        forest: &UsbForest,
        items: &mut Vec<TreeItem>,
        device: &UsbDevice,
        depth: usize,
        seen: &mut HashSet<DeviceKey>,
    ) {
        if !seen.insert(device.key()) {
            return;
        }

        let has_children = forest.children(device).next().is_some();
        items.push(TreeItem::Device {
            key: device.key(),
            label: self.config.display_name(device),
            port: (!device.is_bus_root()).then_some(device.port),
            is_hub: device.is_hub(),
            speed_name: device.speed.short_name().to_string(),
            depth,
            has_children,
        });

        if has_children && self.is_expanded(device.key()) {
            for (_, child) in forest.children(device) {
                self.add_device_items(forest, items, child, depth + 1, seen);
            }
        }
    }

    /// Key of the selected row.
    pub fn selected_key(&self) -> Option<DeviceKey> {
        self.visible_items().get(self.selected).map(TreeItem::key)
    }

    /// Get the currently selected device (if any).
    pub fn get_selected_device(&self) -> Option<&UsbDevice> {
        let key = self.selected_key().filter(|key| *key != ROOT_KEY)?;
        self.forest()?.get(key)
    }

    /// Text for the description panel.
    pub fn details_text(&self) -> String {
        if let Some(device) = self.get_selected_device() {
            return device_text(device, &self.config);
        }
        match self.session.report() {
            Some(report) => {
                let forest = &report.forest;
                let mut text = format!(
                    "{}\nBuses: {}\nDevices: {}",
                    ROOT_NAME,
                    forest.bus_count(),
                    forest.reachable_count()
                );
                if !forest.orphans().is_empty() {
                    text.push_str(&format!("\nUnattached: {}", forest.orphans().len()));
                }
                if !report.diagnostics.is_empty() {
                    text.push_str(&format!("\nWarnings: {}", report.diagnostics.len()));
                }
                text
            }
            None => String::new(),
        }
    }

    /// Get device count string.
    pub fn device_count_str(&self) -> String {
        match self.forest() {
            Some(forest) => format!(
                "{} devices on {} buses",
                forest.reachable_count(),
                forest.bus_count()
            ),
            None => "no data".to_string(),
        }
    }
}

/// Tree item types for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeItem {
    Root {
        label: String,
        bus_count: usize,
    },
    Device {
        key: DeviceKey,
        label: String,
        /// Port on the parent hub; `None` for bus roots.
        port: Option<u8>,
        is_hub: bool,
        speed_name: String,
        depth: usize,
        has_children: bool,
    },
}

impl TreeItem {
    /// Get unique key for expansion tracking.
    pub fn key(&self) -> DeviceKey {
        match self {
            TreeItem::Root { .. } => ROOT_KEY,
            TreeItem::Device { key, .. } => *key,
        }
    }

    /// Get depth for indentation.
    pub fn depth(&self) -> usize {
        match self {
            TreeItem::Root { .. } => 0,
            TreeItem::Device { depth, .. } => *depth,
        }
    }

    pub fn has_children(&self) -> bool {
        match self {
            TreeItem::Root { bus_count, .. } => *bus_count > 0,
            TreeItem::Device { has_children, .. } => *has_children,
        }
    }

    /// Format as display line.
    pub fn display_line(&self) -> String {
        match self {
            TreeItem::Root { label, .. } => label.clone(),
            TreeItem::Device {
                label,
                port,
                speed_name,
                ..
            } => match port {
                Some(port) => format!("[{}] {} ({})", port, label, speed_name),
                None => format!("{} ({})", label, speed_name),
            },
        }
    }
}
