//! Text output: device descriptions, tree listings and reports.

pub mod describe;
pub mod report;
pub mod tree;

pub use describe::{Description, DescriptionLine, describe};
pub use report::{device_text, render_diagnostics, render_report};
pub use tree::{device_line, render_tree};
