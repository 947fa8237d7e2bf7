//! Command-line interface for filesorter.
//!
//! This module handles:
//! - Argument parsing
//! - Configuration loading and root resolution
//! - Running a sort, a dry run, or an undo
//! - Mapping the outcome to an exit status

use crate::config::{CompiledConfig, SorterConfig};
use crate::history::OperationLog;
use crate::logging::{self, LogTarget};
use crate::output::OutputFormatter;
use crate::sorter::Sorter;
use crate::undo::UndoManager;
use anyhow::{Context, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::info;

/// Sort files into subfolders by extension.
#[derive(Debug, Parser)]
#[command(name = "filesorter", version, about)]
pub struct Cli {
    /// Directory to sort. Falls back to `root` in the configuration file.
    pub root: Option<PathBuf>,

    /// Path to a TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Only sort the top-level directory.
    #[arg(long)]
    pub no_recursive: bool,

    /// Show what would be moved without changing anything.
    #[arg(long, conflicts_with = "undo")]
    pub dry_run: bool,

    /// Revert the previous sorting run.
    #[arg(long)]
    pub undo: bool,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn command(&self) -> SortCommand {
        if self.undo {
            SortCommand::Undo
        } else {
            SortCommand::Sort {
                dry_run: self.dry_run,
            }
        }
    }
}

/// The action to perform on a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortCommand {
    /// Sort files into category folders.
    Sort {
        /// If true, report the moves without performing them.
        dry_run: bool,
    },
    /// Revert the previous sort.
    Undo,
}

/// Final status of a run that did not abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// Some files could not be processed.
    PartialFailure(usize),
}

impl RunStatus {
    pub fn exit_code(self) -> ExitCode {
        match self {
            RunStatus::Success => ExitCode::SUCCESS,
            RunStatus::PartialFailure(_) => ExitCode::from(2),
        }
    }
}

/// Runs the application for parsed arguments.
///
/// Loads the configuration, resolves and validates the root directory before
/// anything is written, installs logging, and executes the command.
pub fn run(cli: &Cli) -> anyhow::Result<RunStatus> {
    let start = Instant::now();

    let config = SorterConfig::load(cli.config.as_deref())
        .context("error loading configuration")?
        .compile()
        .context("error in configuration")?;
    let config = if cli.no_recursive {
        config.with_recursive(false)
    } else {
        config
    };

    let root = resolve_root(cli.root.as_deref(), &config)?;
    Sorter::validate_root(&root)?;

    let command = cli.command();
    let log_target = match command {
        SortCommand::Sort { dry_run: true } => LogTarget::Stderr,
        _ => LogTarget::Directory(root.join(config.log_dir())),
    };
    logging::init(&log_target, cli.verbose)?;

    let status = run_command(command, &root, config)?;

    let elapsed = start.elapsed();
    info!("Execution time: {:.3} seconds", elapsed.as_secs_f64());
    OutputFormatter::elapsed(elapsed);

    Ok(status)
}

/// Picks the root from the command line, then from the configuration.
pub fn resolve_root(cli_root: Option<&Path>, config: &CompiledConfig) -> anyhow::Result<PathBuf> {
    match cli_root.or(config.root()) {
        Some(root) => Ok(root.to_path_buf()),
        None => bail!(
            "no directory given: pass one on the command line or set `root` in the configuration"
        ),
    }
}

/// Executes `command` on `root` with an already compiled configuration.
///
/// # Examples
///
/// ```no_run
/// use filesorter::cli::{run_command, SortCommand};
/// use filesorter::config::CompiledConfig;
/// use std::path::Path;
///
/// let status = run_command(
///     SortCommand::Sort { dry_run: false },
///     Path::new("/path/to/directory"),
///     CompiledConfig::default(),
/// );
/// match status {
///     Ok(status) => println!("Finished: {:?}", status),
///     Err(e) => eprintln!("Error: {:#}", e),
/// }
/// ```
pub fn run_command(
    command: SortCommand,
    root: &Path,
    config: CompiledConfig,
) -> anyhow::Result<RunStatus> {
    match command {
        SortCommand::Sort { dry_run } => sort_directory(root, config, dry_run),
        SortCommand::Undo => undo_sort(root, config.log_dir()),
    }
}

fn sort_directory(root: &Path, config: CompiledConfig, dry_run: bool) -> anyhow::Result<RunStatus> {
    let message = format!("Sorting files by extensions in {}", root.display());
    if dry_run {
        OutputFormatter::dry_run_notice(&message);
    } else {
        OutputFormatter::info(&message);
    }
    info!("{}", message);

    let log_dir = config.log_dir().to_string();
    let sorter = Sorter::new(config).with_dry_run(dry_run);

    let spinner = OutputFormatter::create_spinner("Sorting...");
    let result = sorter.sort(root);
    spinner.finish_and_clear();
    let report = result?;

    OutputFormatter::sort_report(&report);

    if dry_run {
        OutputFormatter::success("Dry run complete. No files were modified.");
    } else if !report.operations.is_empty() {
        match OperationLog::from_report(&report).save(&log_dir) {
            Ok(path) => {
                info!("History saved to {}", path.display());
                OutputFormatter::plain(&format!(
                    "History saved. Use 'filesorter {} --undo' to revert changes.",
                    root.display()
                ));
            }
            Err(e) => OutputFormatter::warning(&format!("Could not save history: {}", e)),
        }
    }

    if report.is_success() {
        info!("Sorted {} files", report.moved_files());
        if !dry_run {
            OutputFormatter::success(&format!("Sorted {} files.", report.moved_files()));
        }
        Ok(RunStatus::Success)
    } else {
        let failed = report.failures.len();
        tracing::warn!("Sorting finished with {} failures", failed);
        OutputFormatter::warning(&format!(
            "Partial failure: {} item(s) could not be sorted.",
            failed
        ));
        Ok(RunStatus::PartialFailure(failed))
    }
}

fn undo_sort(root: &Path, log_dir: &str) -> anyhow::Result<RunStatus> {
    OutputFormatter::info("Undoing previous sort...");
    let report = UndoManager::undo(root, log_dir)?;
    OutputFormatter::undo_report(&report);

    if report.is_complete_success() {
        Ok(RunStatus::Success)
    } else {
        Ok(RunStatus::PartialFailure(
            report.failed_restores.len() + report.skipped_files.len(),
        ))
    }
}
