//! Sorter configuration loaded from TOML.
//!
//! The configuration names the directory to sort, the reserved log directory,
//! whether to descend into subdirectories, the extension categories, and the
//! file filters applied before a file is classified.
//!
//! # Configuration File Format
//!
//! ```toml
//! root = "/home/me/Downloads"
//! log_dir = "logs"
//! recursive = true
//!
//! [categories]
//! images = ["jpg", "jpeg", "png"]
//! docs = ["txt", "pdf"]
//!
//! [filters]
//! enable_hidden_files = true
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.part", "node_modules/**"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//! ```
//!
//! When `[categories]` is absent the built-in table from
//! [`ExtensionMap::builtin`] is used.

use crate::extension_map::{ExtensionMap, MappingError};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".filesorterrc.toml";

/// Default name of the reserved log directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Errors that can occur during configuration loading and compilation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("invalid configuration in {}: {source}", .path.display())]
    ConfigInvalid {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// Invalid glob pattern provided.
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidGlobPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    /// Invalid regex pattern provided.
    #[error("invalid regex pattern '{pattern}': {source}")]
    InvalidRegexPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    /// The category table is inconsistent.
    #[error(transparent)]
    Mapping(#[from] MappingError),
    /// A category uses the name reserved for the log directory.
    #[error("category '{0}' collides with the reserved log directory name")]
    ReservedCategory(String),
    /// The log directory name is not a single directory name.
    #[error("invalid log directory name '{0}'")]
    InvalidLogDir(String),
    /// IO error while reading configuration.
    #[error("failed to read configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Raw configuration as read from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SorterConfig {
    /// Directory to sort when none is given on the command line.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Reserved directory name that holds logs and history. Never sorted.
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Whether to descend into plain subdirectories.
    #[serde(default = "default_recursive")]
    pub recursive: bool,

    /// `category -> extensions` table. Replaces the built-in table if present.
    #[serde(default)]
    pub categories: Option<BTreeMap<String, Vec<String>>>,

    #[serde(default)]
    pub filters: FilterRules,
}

/// Filter rules applied to every file before classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether to sort hidden files (starting with "."). Defaults to true.
    #[serde(default = "default_enable_hidden_files")]
    pub enable_hidden_files: bool,

    /// Rules for excluding files.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including files (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

/// Rules for excluding files from sorting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., ".DS_Store", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the path relative to the sort root.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Rules for including files, overriding exclude rules (whitelist).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

fn default_log_dir() -> String {
    DEFAULT_LOG_DIR.to_string()
}

fn default_recursive() -> bool {
    true
}

fn default_enable_hidden_files() -> bool {
    true
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            enable_hidden_files: default_enable_hidden_files(),
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            root: None,
            log_dir: default_log_dir(),
            recursive: default_recursive(),
            categories: None,
            filters: FilterRules::default(),
        }
    }
}

impl SorterConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.filesorterrc.toml` in the current directory
    /// 3. Look for `~/.config/filesorter/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read,
    /// or if any discovered file is not valid TOML.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("filesorter")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&content).map_err(|source| ConfigError::ConfigInvalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Validate the configuration and compile it into the form the sorter uses.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid log directory name, an inconsistent
    /// category table, a category named like the log directory, or invalid
    /// glob/regex patterns.
    pub fn compile(self) -> Result<CompiledConfig, ConfigError> {
        if !is_plain_dir_name(&self.log_dir) {
            return Err(ConfigError::InvalidLogDir(self.log_dir));
        }

        let extensions = match &self.categories {
            Some(table) => ExtensionMap::from_categories(table)?,
            None => ExtensionMap::builtin(),
        };
        if extensions.is_category(&self.log_dir) {
            return Err(ConfigError::ReservedCategory(self.log_dir));
        }

        Ok(CompiledConfig {
            root: self.root,
            log_dir: self.log_dir,
            recursive: self.recursive,
            extensions,
            filters: CompiledFilters::new(self.filters)?,
        })
    }
}

fn is_plain_dir_name(name: &str) -> bool {
    !name.trim().is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Validated configuration handed to the [`Sorter`](crate::sorter::Sorter).
#[derive(Debug, Clone)]
pub struct CompiledConfig {
    root: Option<PathBuf>,
    log_dir: String,
    recursive: bool,
    extensions: ExtensionMap,
    filters: CompiledFilters,
}

impl CompiledConfig {
    /// Configuration with the given extension map and default settings:
    /// recursive, log directory `logs`, no filters.
    pub fn new(extensions: ExtensionMap) -> Self {
        Self {
            root: None,
            log_dir: default_log_dir(),
            recursive: default_recursive(),
            extensions,
            filters: CompiledFilters::default(),
        }
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Sets the reserved log directory name.
    ///
    /// # Errors
    ///
    /// Fails if the name is not a plain directory name or is a category name.
    pub fn with_log_dir(mut self, log_dir: &str) -> Result<Self, ConfigError> {
        if !is_plain_dir_name(log_dir) {
            return Err(ConfigError::InvalidLogDir(log_dir.to_string()));
        }
        if self.extensions.is_category(log_dir) {
            return Err(ConfigError::ReservedCategory(log_dir.to_string()));
        }
        self.log_dir = log_dir.to_string();
        Ok(self)
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn log_dir(&self) -> &str {
        &self.log_dir
    }

    pub fn recursive(&self) -> bool {
        self.recursive
    }

    pub fn extensions(&self) -> &ExtensionMap {
        &self.extensions
    }

    pub fn filters(&self) -> &CompiledFilters {
        &self.filters
    }

    /// Returns true if a directory with this name must never be descended into.
    pub fn is_reserved_dir(&self, name: &str) -> bool {
        name == self.log_dir || self.extensions.is_category(name)
    }
}

impl Default for CompiledConfig {
    fn default() -> Self {
        Self::new(ExtensionMap::builtin())
    }
}

/// Compiled filter structures for efficient file matching.
#[derive(Debug, Clone)]
pub struct CompiledFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    /// Create compiled filters from filter rules.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex patterns are invalid.
    pub fn new(rules: FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.into_iter().collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Check if a file should be sorted.
    ///
    /// `relative_path` is the file's path relative to the sort root. Checks are
    /// performed in this order, with early termination:
    /// 1. Include patterns (whitelist) - if matched, always include
    /// 2. Hidden file filter - if hidden and disabled, exclude
    /// 3. Exact filename match - if matched, exclude
    /// 4. Glob pattern match - if matched, exclude
    /// 5. Regex pattern match - if matched, exclude
    /// 6. Default: include
    pub fn should_include(&self, relative_path: &Path) -> bool {
        let file_name = relative_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.matches_any(&self.include_patterns, relative_path) {
            return true;
        }

        if !self.enable_hidden_files && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if self.matches_any(&self.exclude_patterns, relative_path) {
            return false;
        }

        !self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&file_name))
    }

    fn matches_any(&self, patterns: &[Pattern], path: &Path) -> bool {
        patterns.iter().any(|pattern| pattern.matches_path(path))
    }
}

impl Default for CompiledFilters {
    fn default() -> Self {
        Self {
            enable_hidden_files: default_enable_hidden_files(),
            exclude_filenames: HashSet::new(),
            exclude_patterns: Vec::new(),
            exclude_regexes: Vec::new(),
            include_patterns: Vec::new(),
        }
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|source| ConfigError::InvalidGlobPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(rules: FilterRules) -> CompiledFilters {
        CompiledFilters::new(rules).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = SorterConfig::default();
        assert_eq!(config.log_dir, "logs");
        assert!(config.recursive);
        assert!(config.filters.enable_hidden_files);
        assert!(config.categories.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config = SorterConfig::from_toml_str(
            r#"
            root = "/tmp/downloads"
            log_dir = "sorter-logs"
            recursive = false

            [categories]
            images = ["jpg", "png"]
            docs = ["txt"]

            [filters]
            enable_hidden_files = false

            [filters.exclude]
            filenames = ["Thumbs.db"]
            "#,
        )
        .unwrap();

        assert_eq!(config.root, Some(PathBuf::from("/tmp/downloads")));
        assert!(!config.recursive);

        let compiled = config.compile().unwrap();
        assert_eq!(compiled.log_dir(), "sorter-logs");
        assert_eq!(compiled.extensions().category_for("png"), Some("images"));
        assert_eq!(compiled.extensions().category_for("mp3"), None);
        assert!(compiled.is_reserved_dir("docs"));
        assert!(compiled.is_reserved_dir("sorter-logs"));
        assert!(!compiled.is_reserved_dir("logs"));
    }

    #[test]
    fn test_empty_config_uses_builtin_categories() {
        let compiled = SorterConfig::from_toml_str("")
            .unwrap()
            .compile()
            .unwrap();
        assert_eq!(compiled.extensions().category_for("jpg"), Some("images"));
        assert!(compiled.recursive());
        assert!(compiled.root().is_none());
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        assert!(SorterConfig::from_toml_str("recursive = maybe").is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = SorterConfig::load(Some(Path::new("/non/existent/filesorter.toml")));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[categories]\npictures = [\"jpg\"]\n").unwrap();

        let compiled = SorterConfig::load(Some(&path)).unwrap().compile().unwrap();
        assert_eq!(compiled.extensions().category_for("jpg"), Some("pictures"));
    }

    #[test]
    fn test_category_named_like_log_dir_is_rejected() {
        let config = SorterConfig {
            categories: Some(BTreeMap::from([(
                "logs".to_string(),
                vec!["log".to_string()],
            )])),
            ..Default::default()
        };
        assert!(matches!(
            config.compile(),
            Err(ConfigError::ReservedCategory(name)) if name == "logs"
        ));
    }

    #[test]
    fn test_invalid_log_dir_is_rejected() {
        let config = SorterConfig {
            log_dir: "a/b".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.compile(), Err(ConfigError::InvalidLogDir(_))));
    }

    #[test]
    fn test_duplicate_extension_is_rejected() {
        let config = SorterConfig {
            categories: Some(BTreeMap::from([
                ("images".to_string(), vec!["jpg".to_string()]),
                ("photos".to_string(), vec!["jpg".to_string()]),
            ])),
            ..Default::default()
        };
        assert!(matches!(config.compile(), Err(ConfigError::Mapping(_))));
    }

    #[test]
    fn test_with_log_dir_rejects_category_name() {
        let result = CompiledConfig::default().with_log_dir("images");
        assert!(matches!(result, Err(ConfigError::ReservedCategory(_))));
    }

    #[test]
    fn test_hidden_files_included_by_default() {
        let compiled = CompiledFilters::default();
        assert!(compiled.should_include(Path::new(".hidden.jpg")));
    }

    #[test]
    fn test_hidden_files_excluded_when_disabled() {
        let compiled = filters(FilterRules {
            enable_hidden_files: false,
            ..Default::default()
        });
        assert!(!compiled.should_include(Path::new(".hidden.jpg")));
        assert!(compiled.should_include(Path::new("visible.jpg")));
    }

    #[test]
    fn test_exclude_exact_filename() {
        let compiled = filters(FilterRules {
            exclude: ExcludeRules {
                filenames: vec!["Thumbs.db".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });

        assert!(!compiled.should_include(Path::new("Thumbs.db")));
        assert!(!compiled.should_include(Path::new("sub/Thumbs.db")));
        assert!(compiled.should_include(Path::new("image.jpg")));
    }

    #[test]
    fn test_exclude_glob_patterns_use_relative_path() {
        let compiled = filters(FilterRules {
            exclude: ExcludeRules {
                patterns: vec!["*.part".to_string(), "node_modules/**".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });

        assert!(!compiled.should_include(Path::new("movie.mp4.part")));
        assert!(!compiled.should_include(Path::new("node_modules/pkg/index.js")));
        assert!(compiled.should_include(Path::new("src/index.js")));
    }

    #[test]
    fn test_exclude_regex() {
        let compiled = filters(FilterRules {
            exclude: ExcludeRules {
                regex: vec![r"^draft_.*\.txt$".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });

        assert!(!compiled.should_include(Path::new("draft_notes.txt")));
        assert!(compiled.should_include(Path::new("notes.txt")));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let compiled = filters(FilterRules {
            enable_hidden_files: false,
            exclude: ExcludeRules {
                filenames: vec!["keep.txt".to_string()],
                ..Default::default()
            },
            include: IncludeRules {
                patterns: vec![".important".to_string(), "keep.txt".to_string()],
            },
        });

        assert!(compiled.should_include(Path::new(".important")));
        assert!(compiled.should_include(Path::new("keep.txt")));
        assert!(!compiled.should_include(Path::new(".other")));
    }

    #[test]
    fn test_invalid_patterns_return_errors() {
        let bad_regex = CompiledFilters::new(FilterRules {
            exclude: ExcludeRules {
                regex: vec!["[invalid(".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });
        assert!(matches!(
            bad_regex,
            Err(ConfigError::InvalidRegexPattern { .. })
        ));

        let bad_glob = CompiledFilters::new(FilterRules {
            exclude: ExcludeRules {
                patterns: vec!["[invalid".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });
        assert!(matches!(bad_glob, Err(ConfigError::InvalidGlobPattern { .. })));
    }
}
