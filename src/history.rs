/// Move journal for sorting runs.
///
/// Every real run that moves at least one file records its moves in
/// `<root>/<log_dir>/history.json`. The log directory is reserved, so the
/// journal itself is never sorted. [`UndoManager`](crate::undo::UndoManager)
/// reads it back to revert the run.
use crate::sorter::SortReport;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the journal inside the log directory.
pub const HISTORY_FILE_NAME: &str = "history.json";

/// A single file move performed by a sorting run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Path of the file before sorting.
    pub original_path: PathBuf,
    /// Path of the file after sorting.
    pub new_path: PathBuf,
    /// The category folder the file was moved into.
    pub category: String,
}

impl Operation {
    pub fn new(original_path: PathBuf, new_path: PathBuf, category: &str) -> Self {
        Self {
            original_path,
            new_path,
            category: category.to_string(),
        }
    }
}

/// Errors that can occur while reading or writing the journal, or undoing a run.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The directory the journal belongs to does not exist.
    #[error("invalid root directory {}", .path.display())]
    InvalidRoot { path: PathBuf },
    #[error("failed to read history file {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write history file {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid history file {}: {source}", .path.display())]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize history: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("no previous sorting run found in {}", .root.display())]
    NothingToUndo { root: PathBuf },
}

/// Result type for journal operations.
pub type HistoryResult<T> = Result<T, HistoryError>;

/// The recorded moves of one sorting run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationLog {
    /// RFC 3339 timestamp of the run.
    pub timestamp: String,
    /// Root directory of the run.
    pub root: PathBuf,
    /// Moves in the order they were performed.
    pub operations: Vec<Operation>,
    /// Category folders created by the run, in creation order.
    #[serde(default)]
    pub created_dirs: Vec<PathBuf>,
}

impl OperationLog {
    /// Creates an empty log for `root`.
    pub fn new(root: PathBuf) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            root,
            operations: Vec::new(),
            created_dirs: Vec::new(),
        }
    }

    /// Builds a log from the outcome of a sorting pass.
    pub fn from_report(report: &SortReport) -> Self {
        let mut log = Self::new(report.root.clone());
        log.operations = report.operations.clone();
        log.created_dirs = report.created_dirs.clone();
        log
    }

    pub fn add_operation(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    /// Returns the journal path for a root and log directory name.
    pub fn history_file_path(root: &Path, log_dir: &str) -> PathBuf {
        root.join(log_dir).join(HISTORY_FILE_NAME)
    }

    /// Writes this log as pretty-printed JSON, creating the log directory if
    /// needed. Returns the path written.
    pub fn save(&self, log_dir: &str) -> HistoryResult<PathBuf> {
        let history_path = Self::history_file_path(&self.root, log_dir);
        if let Some(parent) = history_path.parent() {
            fs::create_dir_all(parent).map_err(|source| HistoryError::WriteFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(HistoryError::Serialize)?;
        fs::write(&history_path, json).map_err(|source| HistoryError::WriteFailed {
            path: history_path.clone(),
            source,
        })?;

        Ok(history_path)
    }

    /// Loads the most recent log for `root`, if any.
    pub fn load(root: &Path, log_dir: &str) -> HistoryResult<Option<Self>> {
        let history_path = Self::history_file_path(root, log_dir);
        if !history_path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&history_path).map_err(|source| HistoryError::ReadFailed {
            path: history_path.clone(),
            source,
        })?;

        serde_json::from_str(&json)
            .map(Some)
            .map_err(|source| HistoryError::InvalidFormat {
                path: history_path,
                source,
            })
    }

    /// Deletes the journal for `root`, if present.
    pub fn delete(root: &Path, log_dir: &str) -> HistoryResult<()> {
        let history_path = Self::history_file_path(root, log_dir);
        if history_path.exists() {
            fs::remove_file(&history_path).map_err(|source| HistoryError::WriteFailed {
                path: history_path,
                source,
            })?;
        }
        Ok(())
    }
}
