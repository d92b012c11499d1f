//! TUI components.

pub mod app;
pub mod render;

pub use app::{App, TreeItem};
pub use render::render;
