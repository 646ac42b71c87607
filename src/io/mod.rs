//! Input/output helpers.
//!
//! - CSV ingest for single and multi-year uploads (`ingest`)
//! - forecast report export to PDF (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
