/// Directory walker that sorts files into category subfolders.
///
/// The [`Sorter`] takes a snapshot of each directory's files, moves every file
/// with a mapped extension into `<dir>/<category>/`, and then, when running
/// recursively, descends into the plain subdirectories of `<dir>`. Category
/// folders and the log directory are never descended into, which keeps the
/// walk from re-sorting its own output.
///
/// Failures are isolated per file: an error while creating a folder or moving
/// a file is recorded in the [`SortReport`] and the walk continues. Only an
/// invalid root aborts before anything is touched.
use crate::config::CompiledConfig;
use crate::history::Operation;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Errors that can occur while sorting.
#[derive(Debug, thiserror::Error)]
pub enum SortError {
    /// The path does not exist.
    #[error("path not found: {}", .path.display())]
    PathNotFound { path: PathBuf },
    /// The root exists but is not a directory.
    #[error("not a directory: {}", .path.display())]
    NotADirectory { path: PathBuf },
    /// Reading, writing or moving was blocked by permissions.
    #[error("permission denied: {}", .path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A file with the same name already exists at the destination.
    #[error(
        "cannot move {} to {}: destination already exists",
        .from.display(),
        .to.display()
    )]
    MoveCollision { from: PathBuf, to: PathBuf },
    /// A regular file occupies the name of a category folder.
    #[error("cannot create folder {}: a file with that name exists", .path.display())]
    SubfolderBlocked { path: PathBuf },
    /// Any other I/O failure.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SortError {
    /// Classifies an I/O error that concerns `path`.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::PathNotFound {
                path: path.to_path_buf(),
            },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: path.to_path_buf(),
                source,
            },
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Result type for sorting operations.
pub type SortResult<T> = Result<T, SortError>;

/// A file or directory that could not be processed.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: SortError,
}

/// Outcome of one sorting pass.
#[derive(Debug)]
pub struct SortReport {
    /// Root of the pass. Filters match paths relative to it.
    pub root: PathBuf,
    /// Moves performed, or planned when `dry_run` is set.
    pub operations: Vec<Operation>,
    /// Category folders created by this pass.
    pub created_dirs: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
    pub directories_visited: usize,
    /// Files left in place: no extension, unmapped extension, or filtered out.
    pub skipped_files: usize,
    pub dry_run: bool,
}

impl SortReport {
    fn new(root: &Path, dry_run: bool) -> Self {
        Self {
            root: root.to_path_buf(),
            operations: Vec::new(),
            created_dirs: Vec::new(),
            failures: Vec::new(),
            directories_visited: 0,
            skipped_files: 0,
            dry_run,
        }
    }

    pub fn moved_files(&self) -> usize {
        self.operations.len()
    }

    /// Number of moved files per category.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for operation in &self.operations {
            *counts.entry(operation.category.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Returns true if nothing failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, path: &Path, error: SortError) {
        warn!("{}: {}", path.display(), error);
        self.failures.push(FileFailure {
            path: path.to_path_buf(),
            error,
        });
    }
}

/// Sorts directories according to a [`CompiledConfig`].
#[derive(Debug, Clone)]
pub struct Sorter {
    config: CompiledConfig,
    dry_run: bool,
}

impl Sorter {
    pub fn new(config: CompiledConfig) -> Self {
        Self {
            config,
            dry_run: false,
        }
    }

    /// When enabled, report what would be moved without touching the tree.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Checks that `root` exists and is a directory.
    pub fn validate_root(root: &Path) -> SortResult<()> {
        let metadata = fs::metadata(root).map_err(|e| SortError::from_io(root, e))?;
        if !metadata.is_dir() {
            return Err(SortError::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Sorts `root`, descending into subdirectories if the configuration is
    /// recursive.
    ///
    /// The root is canonicalized first, so recorded moves hold absolute paths
    /// that stay valid from any working directory.
    ///
    /// # Errors
    ///
    /// Returns an error only if `root` is missing or not a directory. Failures
    /// on individual files are collected in the returned report.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use filesorter::config::CompiledConfig;
    /// use filesorter::sorter::Sorter;
    /// use std::path::Path;
    ///
    /// let sorter = Sorter::new(CompiledConfig::default());
    /// match sorter.sort(Path::new("/path/to/downloads")) {
    ///     Ok(report) => println!("Moved {} files", report.moved_files()),
    ///     Err(e) => eprintln!("Sorting failed: {}", e),
    /// }
    /// ```
    pub fn sort(&self, root: &Path) -> SortResult<SortReport> {
        Self::validate_root(root)?;
        let root = fs::canonicalize(root).map_err(|e| SortError::from_io(root, e))?;
        Ok(self.sort_directory(&root, self.config.recursive()))
    }

    /// Sorts the files directly in `dir` and, if `recursive`, every plain
    /// subdirectory below it. `dir` is treated as the root of the pass.
    pub fn sort_directory(&self, dir: &Path, recursive: bool) -> SortReport {
        let mut report = SortReport::new(dir, self.dry_run);
        self.walk(dir, recursive, &mut report);
        report
    }

    fn walk(&self, dir: &Path, recursive: bool, report: &mut SortReport) {
        debug!("Sorting {}", dir.display());
        report.directories_visited += 1;

        // Both listings are taken up front so moves never disturb iteration.
        let files = match list_files(dir) {
            Ok(files) => files,
            Err(e) => {
                report.fail(dir, SortError::from_io(dir, e));
                return;
            }
        };

        for file in &files {
            self.sort_file(dir, file, report);
        }

        if !recursive {
            return;
        }

        let subdirs = match list_subdirectories(dir) {
            Ok(subdirs) => subdirs,
            Err(e) => {
                report.fail(dir, SortError::from_io(dir, e));
                return;
            }
        };

        for subdir in &subdirs {
            if self.is_reserved(subdir) {
                debug!("Skipping reserved directory {}", subdir.display());
                continue;
            }
            self.walk(subdir, true, report);
        }
    }

    fn is_reserved(&self, dir: &Path) -> bool {
        dir.file_name()
            .map(|name| self.config.is_reserved_dir(&name.to_string_lossy()))
            .unwrap_or(false)
    }

    fn sort_file(&self, dir: &Path, file: &Path, report: &mut SortReport) {
        let Some(file_name) = file.file_name() else {
            report.skipped_files += 1;
            return;
        };
        let name = file_name.to_string_lossy();

        let relative = file.strip_prefix(&report.root).unwrap_or(file);
        if !self.config.filters().should_include(relative) {
            debug!("Filtered out {}", relative.display());
            report.skipped_files += 1;
            return;
        }

        let Some(category) = self.config.extensions().category_for(classify(&name)) else {
            report.skipped_files += 1;
            return;
        };

        let category_dir = dir.join(category);
        let destination = category_dir.join(file_name);

        if let Err(e) = check_destination(file, &category_dir, &destination) {
            report.fail(file, e);
            return;
        }

        if self.dry_run {
            if !category_dir.exists() && !report.created_dirs.contains(&category_dir) {
                report.created_dirs.push(category_dir);
            }
            report
                .operations
                .push(Operation::new(file.to_path_buf(), destination, category));
            return;
        }

        match ensure_subfolder(dir, category) {
            Ok(true) => report.created_dirs.push(category_dir),
            Ok(false) => {}
            Err(e) => {
                report.fail(file, e);
                return;
            }
        }

        if let Err(e) = move_file(file, &destination) {
            report.fail(file, e);
            return;
        }

        info!("{} ---> {}/{}", name, category, name);
        report
            .operations
            .push(Operation::new(file.to_path_buf(), destination, category));
    }
}

/// Lists the files directly inside `dir`, in name order.
///
/// Subdirectories are excluded, and so are symbolic links that resolve to a
/// directory.
pub fn list_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            continue;
        }
        let path = entry.path();
        if file_type.is_symlink() && path.is_dir() {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

/// Lists the real subdirectories directly inside `dir`, in name order.
pub fn list_subdirectories(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Creates `dir/name` (and any missing parents) if it does not exist.
///
/// Returns `Ok(true)` if the folder was created and `Ok(false)` if it already
/// existed.
pub fn ensure_subfolder(dir: &Path, name: &str) -> SortResult<bool> {
    let path = dir.join(name);
    match fs::metadata(&path) {
        Ok(metadata) if metadata.is_dir() => Ok(false),
        Ok(_) => Err(SortError::SubfolderBlocked { path }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(&path).map_err(|e| SortError::from_io(&path, e))?;
            Ok(true)
        }
        Err(e) => Err(SortError::from_io(&path, e)),
    }
}

/// Returns the extension of `file_name`: the text after the last `.`, or an
/// empty string if there is no `.`.
///
/// ```
/// use filesorter::sorter::classify;
///
/// assert_eq!(classify("photo.JPG"), "JPG");
/// assert_eq!(classify("archive.tar.gz"), "gz");
/// assert_eq!(classify("Makefile"), "");
/// ```
pub fn classify(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension)
        .unwrap_or("")
}

/// Checks that `file` can be moved to `destination` inside `category_dir`:
/// the folder must be a directory or absent, and the destination must be free.
fn check_destination(file: &Path, category_dir: &Path, destination: &Path) -> SortResult<()> {
    match fs::metadata(category_dir) {
        Ok(metadata) if !metadata.is_dir() => Err(SortError::SubfolderBlocked {
            path: category_dir.to_path_buf(),
        }),
        Ok(_) if destination.symlink_metadata().is_ok() => Err(SortError::MoveCollision {
            from: file.to_path_buf(),
            to: destination.to_path_buf(),
        }),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SortError::from_io(category_dir, e)),
    }
}

/// Moves `from` to `to`, refusing to overwrite an existing entry.
fn move_file(from: &Path, to: &Path) -> SortResult<()> {
    if to.symlink_metadata().is_ok() {
        return Err(SortError::MoveCollision {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
    }
    fs::rename(from, to).map_err(|e| SortError::from_io(from, e))
}
