//! User actions understood by the dashboard.

use std::path::PathBuf;

/// One user action; each maps to exactly one dashboard operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send a CSV file to the service and replace the flat dataset with its records.
    Upload { path: PathBuf },
    /// Parse a CSV file locally and replace the flat dataset.
    Load { path: PathBuf },
    /// Parse yearly CSV files and replace the multi-year dataset.
    UploadMulti { paths: Vec<PathBuf> },
    Select { sku: String },
    /// `days` is kept as typed so that non-integers are rejected by validation.
    Forecast { sku: Option<String>, days: String },
    Analyze,
    Compare { sku1: String, sku2: String },
    AnalyzeMulti,
    Export,
    Status,
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Upload { .. } => "upload",
            Command::Load { .. } => "load",
            Command::UploadMulti { .. } => "upload-multi",
            Command::Select { .. } => "select",
            Command::Forecast { .. } => "forecast",
            Command::Analyze => "analyze",
            Command::Compare { .. } => "compare",
            Command::AnalyzeMulti => "analyze-multi",
            Command::Export => "export",
            Command::Status => "status",
        }
    }
}
