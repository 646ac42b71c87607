//! Runtime configuration.
//!
//! Values come from the environment (a `.env` file is honored) and can be
//! overridden from the command line.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CHART_SIZE: ChartSize = ChartSize {
    width: 960,
    height: 450,
};

/// Pixel size of every chart canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSize {
    pub width: u32,
    pub height: u32,
}

impl FromStr for ChartSize {
    type Err = AppError;

    /// Parses `WIDTHxHEIGHT`, e.g. `960x450`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::config(format!("Invalid chart size '{s}' (expected WIDTHxHEIGHT, e.g. 960x450)."));
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width = w.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = h.trim().parse::<u32>().map_err(|_| invalid())?;
        if width < 64 || height < 64 {
            return Err(AppError::config(format!(
                "Chart size {width}x{height} is too small (minimum 64x64)."
            )));
        }
        Ok(Self { width, height })
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Base address of the sales service.
    pub api_url: String,
    /// Per-request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Where reports and chart snapshots are written.
    pub output_dir: PathBuf,
    pub chart_size: ChartSize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: timeout_from_secs(DEFAULT_TIMEOUT_SECS),
            output_dir: PathBuf::from("."),
            chart_size: DEFAULT_CHART_SIZE,
        }
    }
}

impl DashboardConfig {
    /// Load configuration from the environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();

        if let Some(url) = lookup("SALESCOPE_API_URL").filter(|v| !v.trim().is_empty()) {
            config.api_url = url.trim().to_string();
        }
        if let Some(raw) = lookup("SALESCOPE_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                AppError::config(format!("Invalid SALESCOPE_TIMEOUT_SECS '{raw}' (expected whole seconds)."))
            })?;
            config.timeout = timeout_from_secs(secs);
        }
        if let Some(dir) = lookup("SALESCOPE_OUTPUT_DIR").filter(|v| !v.trim().is_empty()) {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(size) = lookup("SALESCOPE_CHART_SIZE") {
            config.chart_size = size.parse()?;
        }

        Ok(config)
    }
}

/// `0` disables the timeout.
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
