//! Charts: specs (pure data), canvases (bitmaps) and the slot manager.

pub mod canvas;
pub mod manager;
pub mod spec;

pub use canvas::Canvas;
pub use manager::{ChartInstance, ChartManager, ChartSlot, ChartStats};
pub use spec::{ChartKind, ChartSpec, Rgb, Series, SeriesStyle};
