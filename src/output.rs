//! Terminal output and styling.
//!
//! All user-facing output goes through [`OutputFormatter`], so the run summary,
//! failure listing and spinner share one look.

use crate::sorter::{FileFailure, SortReport};
use crate::undo::UndoReport;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Prints styled messages and run summaries.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    ///
    /// ```no_run
    /// use filesorter::output::OutputFormatter;
    /// OutputFormatter::info("Sorting files by extensions in /home/user/Downloads");
    /// ```
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a spinner shown while a directory tree is being sorted.
    pub fn create_spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }

    /// Prints a table of moved files per category.
    pub fn summary_table(category_counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let width = category_counts
            .keys()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max("Category".len());

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (category, count) in category_counts {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }

        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files),
            width = width
        );
    }

    /// Prints each failure with its path relative to `root`.
    pub fn failures(root: &Path, failures: &[FileFailure]) {
        if failures.is_empty() {
            return;
        }
        Self::header("FAILURES");
        for failure in failures {
            let path = failure.path.strip_prefix(root).unwrap_or(&failure.path);
            Self::error(&format!("{}: {}", path.display(), failure.error));
        }
    }

    /// Prints the planned or performed moves, then the summary.
    pub fn sort_report(report: &SortReport) {
        if report.dry_run {
            Self::header("DRY RUN: files would be sorted as follows");
            for operation in &report.operations {
                let from = operation
                    .original_path
                    .strip_prefix(&report.root)
                    .unwrap_or(&operation.original_path);
                let to = operation
                    .new_path
                    .strip_prefix(&report.root)
                    .unwrap_or(&operation.new_path);
                Self::plain(&format!(" - {} → {}", from.display(), to.display()));
            }
        }

        if report.operations.is_empty() {
            Self::plain("No files to sort.");
        } else {
            Self::summary_table(&report.category_counts(), report.moved_files());
        }

        Self::plain(&format!(
            "\nDirectories visited: {}, files left in place: {}",
            report.directories_visited, report.skipped_files
        ));
        Self::failures(&report.root, &report.failures);
    }

    /// Prints the outcome of an undo.
    pub fn undo_report(report: &UndoReport) {
        Self::header("UNDO");
        Self::plain(&format!("  Restored: {}", report.restored_files));
        if report.removed_dirs > 0 {
            Self::plain(&format!("  Removed empty folders: {}", report.removed_dirs));
        }
        for backup in &report.backups {
            Self::warning(&format!("Conflicting file backed up to {}", backup.display()));
        }

        if !report.skipped_files.is_empty() {
            Self::plain(&format!("  Skipped: {}", report.skipped_files.len()));
            for (path, reason) in &report.skipped_files {
                Self::plain(&format!("    - {}: {}", path.display(), reason));
            }
        }

        if !report.failed_restores.is_empty() {
            Self::plain(&format!("  Failed: {}", report.failed_restores.len()));
            for (path, reason) in &report.failed_restores {
                Self::error(&format!("{}: {}", path.display(), reason));
            }
        }

        if !report.is_complete_success() {
            Self::warning("History file was NOT deleted. Fix the issues above and try again.");
        }
    }

    /// Prints the elapsed time of the run.
    pub fn elapsed(duration: Duration) {
        Self::plain(&format!(
            "Execution time: {:.3} seconds",
            duration.as_secs_f64()
        ));
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural() {
        assert_eq!(plural(0), "files");
        assert_eq!(plural(1), "file");
        assert_eq!(plural(2), "files");
    }
}
