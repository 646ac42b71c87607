//! Command-line parsing for the sales dashboard.
//!
//! Two layers use clap:
//!
//! - the process arguments ([`Cli`]): global options plus the run mode
//! - each shell / script line ([`parse_shell_line`]), so shell commands get the
//!   same help and error messages as the binary itself

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::command::Command;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "salescope",
    version,
    about = "Sales dashboard: uploads, forecasts, comparisons and PDF reports"
)]
pub struct Cli {
    #[command(flatten)]
    pub options: GlobalArgs,

    #[command(subcommand)]
    pub mode: Mode,
}

/// Options shared by every mode; they override the environment.
#[derive(Debug, Args, Clone, Default)]
pub struct GlobalArgs {
    /// Base address of the sales service (env: SALESCOPE_API_URL).
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Request timeout in seconds, 0 for none (env: SALESCOPE_TIMEOUT_SECS).
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Directory for reports and chart snapshots (env: SALESCOPE_OUTPUT_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Chart canvas size (env: SALESCOPE_CHART_SIZE).
    #[arg(long, global = true, value_name = "WxH")]
    pub chart_size: Option<String>,

    /// Write a PNG snapshot of every rendered chart to the output directory.
    #[arg(long, global = true)]
    pub snapshots: bool,

    /// Verbose logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Mode {
    /// Interactive shell reading commands from stdin (the default).
    Shell,
    /// Execute a file of shell commands, one per line.
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Script file; blank lines and lines starting with `#` are skipped.
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,
}

/// One shell line.
#[derive(Debug, Parser)]
#[command(
    name = "salescope>",
    no_binary_name = true,
    disable_version_flag = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Debug, Subcommand)]
enum ShellCommand {
    /// Upload a CSV file to the service.
    Upload { file: PathBuf },
    /// Load a CSV file locally, without the service.
    Load { file: PathBuf },
    /// Load yearly CSV files (year taken from each file name).
    UploadMulti { files: Vec<PathBuf> },
    /// Select the SKU used by `forecast`.
    Select { sku: String },
    /// Forecast one SKU.
    Forecast {
        /// SKU to forecast (defaults to the selected one).
        #[arg(long)]
        sku: Option<String>,
        /// Horizon in days, 7 to 30.
        #[arg(long, default_value = "7", allow_hyphen_values = true)]
        days: String,
    },
    /// AI analysis of the whole dataset.
    Analyze,
    /// Compare the 14-day forecasts of two SKUs.
    Compare { sku1: String, sku2: String },
    /// AI analysis of the yearly files.
    AnalyzeMulti,
    /// Export the current forecast as a PDF report.
    Export,
    /// Show what is loaded and rendered.
    Status,
    /// Leave the shell.
    #[command(alias = "exit")]
    Quit,
}

/// What a shell line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellAction {
    Run(Command),
    Quit,
}

/// Parse one shell line. Blank lines and `#` comments yield `Ok(None)`.
///
/// `help` and `--help` come back as a clap error of kind `DisplayHelp`,
/// which callers print like any other parse message.
pub fn parse_shell_line(line: &str) -> Result<Option<ShellAction>, clap::Error> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let parsed = ShellLine::try_parse_from(line.split_whitespace())?;
    let action = match parsed.command {
        ShellCommand::Upload { file } => ShellAction::Run(Command::Upload { path: file }),
        ShellCommand::Load { file } => ShellAction::Run(Command::Load { path: file }),
        ShellCommand::UploadMulti { files } => ShellAction::Run(Command::UploadMulti { paths: files }),
        ShellCommand::Select { sku } => ShellAction::Run(Command::Select { sku }),
        ShellCommand::Forecast { sku, days } => ShellAction::Run(Command::Forecast { sku, days }),
        ShellCommand::Analyze => ShellAction::Run(Command::Analyze),
        ShellCommand::Compare { sku1, sku2 } => ShellAction::Run(Command::Compare { sku1, sku2 }),
        ShellCommand::AnalyzeMulti => ShellAction::Run(Command::AnalyzeMulti),
        ShellCommand::Export => ShellAction::Run(Command::Export),
        ShellCommand::Status => ShellAction::Run(Command::Status),
        ShellCommand::Quit => ShellAction::Quit,
    };
    Ok(Some(action))
}
