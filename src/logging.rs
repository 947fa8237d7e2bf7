//! Log setup.
//!
//! Sorting runs log to `<root>/<log_dir>/file_sorter.log`, one line per move.
//! Dry runs must not touch the tree, so they log warnings to stderr instead.

use anyhow::Context;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

/// File name of the run log inside the log directory.
pub const LOG_FILE_NAME: &str = "file_sorter.log";

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Append to `file_sorter.log` inside this directory.
    Directory(PathBuf),
    /// Write to stderr.
    Stderr,
}

/// `HH:MM:SS` local timestamps.
struct ClockTime;

impl FormatTime for ClockTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S"))
    }
}

/// Returns the log file path for a log directory.
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE_NAME)
}

/// Installs the global `tracing` subscriber.
///
/// File logging records everything at DEBUG level when `verbose` is set and
/// INFO otherwise. Stderr logging only shows warnings unless `verbose` is set.
pub fn init(target: &LogTarget, verbose: bool) -> anyhow::Result<()> {
    match target {
        LogTarget::Directory(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let path = log_file_path(dir);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;

            tracing_subscriber::fmt()
                .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .with_timer(ClockTime)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))?;
        }
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_timer(ClockTime)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))?;
        }
    }
    Ok(())
}
