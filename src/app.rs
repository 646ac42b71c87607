//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - resolves configuration (environment, then flags)
//! - wires the HTTP service and console presenter into a `Dashboard`
//! - feeds it shell or script lines

use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal, Write};

use clap::Parser;
use tracing::info;

use crate::cli::{Cli, GlobalArgs, Mode, ShellAction, parse_shell_line};
use crate::config::{DashboardConfig, timeout_from_secs};
use crate::data::service::{HttpSalesService, SalesService};
use crate::error::{AppError, ErrorKind};

pub mod command;
pub mod dashboard;
pub mod presenter;

use dashboard::Dashboard;
use presenter::{ConsolePresenter, Presenter};

const PROMPT: &str = "salescope> ";

/// Entry point for the `salescope` binary.
pub fn run() -> Result<(), AppError> {
    // `salescope` and `salescope --api-url ...` behave like `salescope shell ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);
    crate::logging::init(cli.options.verbose);

    let config = apply_overrides(DashboardConfig::from_env()?, &cli.options)?;
    info!(
        api_url = %config.api_url,
        timeout = ?config.timeout,
        output_dir = %config.output_dir.display(),
        "dashboard configured"
    );

    let service = HttpSalesService::from_config(&config)?;
    let presenter = if cli.options.snapshots {
        ConsolePresenter::with_snapshots(config.output_dir.clone())
    } else {
        ConsolePresenter::new()
    };
    let mut dashboard = Dashboard::new(service, presenter, &config);

    match cli.mode {
        Mode::Shell => {
            let stdin = io::stdin();
            let interactive = stdin.is_terminal();
            if interactive {
                println!("salescope shell. Type `help` for commands, `quit` to leave.");
            }
            run_lines(&mut dashboard, stdin.lock(), interactive)?;
            Ok(())
        }
        Mode::Run(args) => {
            let file = File::open(&args.script).map_err(|e| {
                AppError::parse(format!("Failed to open script '{}': {e}", args.script.display()))
            })?;
            match run_lines(&mut dashboard, BufReader::new(file), false)? {
                None => Ok(()),
                Some(failure) => Err(AppError::new(
                    failure.kind,
                    format!("{} command(s) in '{}' failed.", failure.count, args.script.display()),
                )),
            }
        }
    }
}

/// Failed commands of a shell session; `kind` is the last failure's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failures {
    pub count: usize,
    pub kind: ErrorKind,
}

/// Feed every line of `input` to the dashboard until EOF or `quit`.
///
/// Parse errors are printed and the session continues.
pub fn run_lines<S, P, R>(
    dashboard: &mut Dashboard<S, P>,
    input: R,
    prompt: bool,
) -> Result<Option<Failures>, AppError>
where
    S: SalesService,
    P: Presenter,
    R: BufRead,
{
    let mut failures: Option<Failures> = None;
    let mut record = |kind: ErrorKind| {
        let count = failures.map_or(0, |f| f.count) + 1;
        failures = Some(Failures { count, kind });
    };

    let mut lines = input.lines();
    loop {
        if prompt {
            print!("{PROMPT}");
            let _ = io::stdout().flush();
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.map_err(|e| AppError::parse(format!("Failed to read command input: {e}")))?;

        match parse_shell_line(&line) {
            Ok(None) => {}
            Ok(Some(ShellAction::Quit)) => break,
            Ok(Some(ShellAction::Run(command))) => {
                if !dashboard.dispatch(command) {
                    if let Some(kind) = dashboard.last_failure() {
                        record(kind);
                    }
                }
            }
            Err(err) => {
                let is_help = matches!(
                    err.kind(),
                    clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                );
                let _ = err.print();
                if !is_help {
                    record(ErrorKind::Validation);
                }
            }
        }
    }

    Ok(failures)
}

/// Command-line flags win over the environment.
pub fn apply_overrides(mut config: DashboardConfig, args: &GlobalArgs) -> Result<DashboardConfig, AppError> {
    if let Some(url) = &args.api_url {
        config.api_url = url.clone();
    }
    if let Some(secs) = args.timeout_secs {
        config.timeout = timeout_from_secs(secs);
    }
    if let Some(dir) = &args.out_dir {
        config.output_dir = dir.clone();
    }
    if let Some(size) = &args.chart_size {
        config.chart_size = size.parse()?;
    }
    Ok(config)
}

/// Rewrite argv so `salescope` defaults to `salescope shell`.
///
/// Rules:
/// - `salescope`                     -> `salescope shell`
/// - `salescope --api-url X ...`     -> `salescope shell --api-url X ...`
/// - `salescope --help/--version/-h` -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("shell".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "shell" | "run");
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "shell".to_string());
        return argv;
    }

    argv
}
