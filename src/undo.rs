/// Undo support for sorting runs.
///
/// Reverts the most recent recorded run by moving every file back to where it
/// was, then removing the category folders the run created if they are empty.
use crate::history::{HistoryError, HistoryResult, Operation, OperationLog};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of an undo.
#[derive(Debug, Default)]
pub struct UndoReport {
    /// Number of files moved back.
    pub restored_files: usize,
    /// Files that could not be restored, with the reason.
    pub failed_restores: Vec<(PathBuf, String)>,
    /// Files no longer found where the run put them.
    pub skipped_files: Vec<(PathBuf, String)>,
    /// Conflicting files that were renamed out of the way.
    pub backups: Vec<PathBuf>,
    /// Empty category folders removed after restoring.
    pub removed_dirs: usize,
}

impl UndoReport {
    pub fn total_processed(&self) -> usize {
        self.restored_files + self.failed_restores.len() + self.skipped_files.len()
    }

    /// Returns true if every recorded move was reverted.
    pub fn is_complete_success(&self) -> bool {
        self.failed_restores.is_empty() && self.skipped_files.is_empty()
    }
}

enum RestoreFailure {
    Missing(PathBuf, String),
    Failed(PathBuf, String),
}

/// Reverts sorting runs.
pub struct UndoManager;

impl UndoManager {
    /// Undoes the most recent sorting run under `root`.
    ///
    /// Operations are reverted in reverse order. A file missing from its
    /// recorded location is skipped; a file occupying the original location is
    /// renamed to `<name>.bak.<timestamp>` first. The journal is deleted only
    /// if every file was restored.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use filesorter::undo::UndoManager;
    /// use std::path::Path;
    ///
    /// match UndoManager::undo(Path::new("/path/to/downloads"), "logs") {
    ///     Ok(report) => println!("Restored {} files", report.restored_files),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo(root: &Path, log_dir: &str) -> HistoryResult<UndoReport> {
        if !root.is_dir() {
            return Err(HistoryError::InvalidRoot {
                path: root.to_path_buf(),
            });
        }

        let log = OperationLog::load(root, log_dir)?.ok_or_else(|| HistoryError::NothingToUndo {
            root: root.to_path_buf(),
        })?;

        let mut report = UndoReport::default();
        for operation in log.operations.iter().rev() {
            match Self::restore_file(operation, &mut report.backups) {
                Ok(()) => {
                    info!(
                        "{} <--- {}",
                        operation.original_path.display(),
                        operation.new_path.display()
                    );
                    report.restored_files += 1;
                }
                Err(RestoreFailure::Missing(path, reason)) => {
                    report.skipped_files.push((path, reason));
                }
                Err(RestoreFailure::Failed(path, reason)) => {
                    warn!("{}: {}", path.display(), reason);
                    report.failed_restores.push((path, reason));
                }
            }
        }

        // Deepest folders first so nested category folders empty out in turn.
        for dir in log.created_dirs.iter().rev() {
            if is_empty_dir(dir) && fs::remove_dir(dir).is_ok() {
                report.removed_dirs += 1;
            }
        }

        if report.is_complete_success()
            && let Err(e) = OperationLog::delete(root, log_dir)
        {
            warn!("Could not delete history file: {}", e);
        }

        Ok(report)
    }

    fn restore_file(operation: &Operation, backups: &mut Vec<PathBuf>) -> Result<(), RestoreFailure> {
        if operation.new_path.symlink_metadata().is_err() {
            return Err(RestoreFailure::Missing(
                operation.new_path.clone(),
                "file not found at sorted location".to_string(),
            ));
        }

        if operation.original_path.symlink_metadata().is_ok() {
            let backup_path = Self::generate_backup_path(&operation.original_path);
            fs::rename(&operation.original_path, &backup_path).map_err(|e| {
                RestoreFailure::Failed(
                    operation.original_path.clone(),
                    format!("could not back up conflicting file: {}", e),
                )
            })?;
            backups.push(backup_path);
        }

        fs::rename(&operation.new_path, &operation.original_path).map_err(|e| {
            RestoreFailure::Failed(
                operation.new_path.clone(),
                format!("failed to restore file: {}", e),
            )
        })
    }

    /// Example: `file.txt` becomes `file.txt.bak.20251109-143052`
    fn generate_backup_path(original_path: &Path) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let filename = original_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        original_path.with_file_name(format!("{}.bak.{}", filename, timestamp))
    }
}

fn is_empty_dir(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompiledConfig;
    use crate::extension_map::ExtensionMap;
    use crate::sorter::Sorter;
    use tempfile::TempDir;

    fn sort_and_record(root: &Path) {
        let map = ExtensionMap::from_categories([("images", vec!["png"]), ("docs", vec!["txt"])])
            .unwrap();
        let report = Sorter::new(CompiledConfig::new(map)).sort(root).unwrap();
        OperationLog::from_report(&report)
            .save("logs")
            .expect("Failed to save history");
    }

    #[test]
    fn test_undo_no_history() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = UndoManager::undo(temp_dir.path(), "logs");
        assert!(matches!(result, Err(HistoryError::NothingToUndo { .. })));
    }

    #[test]
    fn test_undo_restores_files_and_removes_folders() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("image.png"), "image data").unwrap();
        fs::write(root.join("notes.txt"), "notes").unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub").join("nested.png"), "nested").unwrap();

        sort_and_record(root);
        assert!(root.join("sub/images/nested.png").exists());

        let report = UndoManager::undo(root, "logs").expect("Undo failed");

        assert_eq!(report.restored_files, 3);
        assert!(report.is_complete_success());
        assert_eq!(report.removed_dirs, 3);
        assert!(root.join("image.png").exists());
        assert!(root.join("notes.txt").exists());
        assert!(root.join("sub/nested.png").exists());
        assert!(!root.join("images").exists());
        assert!(!root.join("sub/images").exists());
        assert!(!OperationLog::history_file_path(root, "logs").exists());
    }

    #[test]
    fn test_undo_keeps_non_empty_category_folder() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("image.png"), "image data").unwrap();

        sort_and_record(root);
        fs::write(root.join("images").join("added-later.png"), "new").unwrap();

        let report = UndoManager::undo(root, "logs").expect("Undo failed");
        assert_eq!(report.restored_files, 1);
        assert_eq!(report.removed_dirs, 0);
        assert!(root.join("images/added-later.png").exists());
    }

    #[test]
    fn test_undo_with_file_name_conflict() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("test.txt"), "original content").unwrap();

        sort_and_record(root);
        fs::write(root.join("test.txt"), "new content").unwrap();

        let report = UndoManager::undo(root, "logs").expect("Undo failed");

        assert_eq!(report.restored_files, 1);
        assert_eq!(report.backups.len(), 1);
        assert_eq!(
            fs::read_to_string(root.join("test.txt")).unwrap(),
            "original content"
        );
        assert_eq!(fs::read_to_string(&report.backups[0]).unwrap(), "new content");
    }

    #[test]
    fn test_undo_with_missing_file_keeps_history() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();

        let mut log = OperationLog::new(root.to_path_buf());
        log.add_operation(Operation::new(
            root.join("nonexistent.txt"),
            root.join("docs").join("nonexistent.txt"),
            "docs",
        ));
        log.save("logs").expect("Failed to save history");

        let report = UndoManager::undo(root, "logs").expect("Undo failed");

        assert_eq!(report.restored_files, 0);
        assert_eq!(report.skipped_files.len(), 1);
        assert_eq!(report.total_processed(), 1);
        assert!(OperationLog::history_file_path(root, "logs").exists());
    }

    #[test]
    fn test_undo_invalid_root() {
        let result = UndoManager::undo(Path::new("/non/existent/path"), "logs");
        assert!(matches!(result, Err(HistoryError::InvalidRoot { .. })));
    }
}
