//! Reporting utilities: analysis text for the dashboard panes.

pub mod format;

pub use format::*;
