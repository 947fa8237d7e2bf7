//! Extension-to-category lookup used to decide where files are sorted.
//!
//! An [`ExtensionMap`] maps a lowercase extension (without the leading dot) to
//! the name of the category subfolder that receives matching files. The set of
//! category names doubles as the list of directories the sorter must never
//! descend into, since those hold already-sorted output.
//!
//! # Examples
//!
//! ```
//! use filesorter::extension_map::ExtensionMap;
//!
//! let map = ExtensionMap::default();
//! assert_eq!(map.category_for("png"), Some("images"));
//! assert_eq!(map.category_for("PDF"), Some("documents"));
//! assert!(map.is_category("audio"));
//! assert_eq!(map.category_for("unknown"), None);
//! ```

use std::collections::{BTreeSet, HashMap};

/// Built-in categories used when the configuration does not provide a table.
const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "images",
        &[
            "png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "tiff", "ico", "heic",
        ],
    ),
    ("audio", &["mp3", "wav", "ogg", "flac", "aac", "m4a", "wma"]),
    (
        "videos",
        &["mp4", "mkv", "avi", "mov", "flv", "wmv", "webm", "3gp"],
    ),
    (
        "documents",
        &["pdf", "txt", "doc", "docx", "html", "htm", "md", "rtf", "odt"],
    ),
    ("archives", &["zip", "rar", "7z", "tar", "gz", "bz2", "xz"]),
    (
        "code",
        &[
            "py", "java", "c", "cpp", "h", "hpp", "js", "ts", "rs", "go", "sh", "bash", "json",
            "xml", "yaml", "yml", "toml",
        ],
    ),
    ("spreadsheets", &["csv", "xls", "xlsx", "ods"]),
    ("presentations", &["ppt", "pptx", "odp"]),
    ("fonts", &["ttf", "otf", "woff", "woff2"]),
];

/// Errors raised while building an [`ExtensionMap`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    /// The same extension was assigned to two different categories.
    #[error("extension '{extension}' is mapped to both '{first}' and '{second}'")]
    DuplicateExtension {
        extension: String,
        first: String,
        second: String,
    },
    /// An extension was empty once the leading dot was stripped.
    #[error("empty extension in category '{category}'")]
    EmptyExtension { category: String },
    /// A category name cannot be used as a single directory name.
    #[error("invalid category name '{0}': must be a single, non-empty directory name")]
    InvalidCategoryName(String),
}

/// Maps file extensions to category subfolder names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionMap {
    extensions: HashMap<String, String>,
    categories: BTreeSet<String>,
}

impl ExtensionMap {
    /// Creates an empty map. Nothing is sorted with an empty map.
    pub fn new() -> Self {
        Self {
            extensions: HashMap::new(),
            categories: BTreeSet::new(),
        }
    }

    /// Returns the built-in category table.
    pub fn builtin() -> Self {
        let mut map = Self::new();
        for (category, extensions) in DEFAULT_CATEGORIES {
            for extension in *extensions {
                // The built-in table has unique, well-formed entries.
                let _ = map.insert(extension, category);
            }
        }
        map
    }

    /// Builds a map from `category -> [extensions]` pairs, as found in the
    /// `[categories]` table of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if a category name is not a plain directory name, if an
    /// extension is empty, or if one extension appears under two categories.
    pub fn from_categories<I, C, E, S>(table: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (C, E)>,
        C: AsRef<str>,
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = Self::new();
        for (category, extensions) in table {
            let category = category.as_ref();
            validate_category_name(category)?;
            map.categories.insert(category.to_string());
            for extension in extensions {
                map.insert(extension.as_ref(), category)?;
            }
        }
        Ok(map)
    }

    /// Adds a single `extension -> category` mapping.
    ///
    /// The extension is normalized: a leading dot is stripped and the result
    /// is lowercased. Re-adding an identical mapping is a no-op.
    pub fn insert(&mut self, extension: &str, category: &str) -> Result<(), MappingError> {
        validate_category_name(category)?;
        let normalized = normalize_extension(extension);
        if normalized.is_empty() {
            return Err(MappingError::EmptyExtension {
                category: category.to_string(),
            });
        }

        if let Some(existing) = self.extensions.get(&normalized) {
            if existing == category {
                return Ok(());
            }
            return Err(MappingError::DuplicateExtension {
                extension: normalized,
                first: existing.clone(),
                second: category.to_string(),
            });
        }

        self.categories.insert(category.to_string());
        self.extensions.insert(normalized, category.to_string());
        Ok(())
    }

    /// Looks up the category for an extension, ignoring case.
    pub fn category_for(&self, extension: &str) -> Option<&str> {
        if extension.is_empty() {
            return None;
        }
        self.extensions
            .get(&extension.to_lowercase())
            .map(String::as_str)
    }

    /// Returns true if `name` is one of the category folder names.
    pub fn is_category(&self, name: &str) -> bool {
        self.categories.contains(name)
    }

}

impl Default for ExtensionMap {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

fn validate_category_name(name: &str) -> Result<(), MappingError> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\']);
    if invalid {
        return Err(MappingError::InvalidCategoryName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_categories() {
        let map = ExtensionMap::builtin();
        assert_eq!(map.category_for("jpg"), Some("images"));
        assert_eq!(map.category_for("mp3"), Some("audio"));
        assert_eq!(map.category_for("mkv"), Some("videos"));
        assert_eq!(map.category_for("txt"), Some("documents"));
        assert_eq!(map.category_for("7z"), Some("archives"));
        assert_eq!(map.category_for("rs"), Some("code"));
        assert_eq!(map.category_for("csv"), Some("spreadsheets"));
        assert_eq!(map.category_for("pptx"), Some("presentations"));
        assert_eq!(map.category_for("otf"), Some("fonts"));
        for (category, _) in DEFAULT_CATEGORIES {
            assert!(map.is_category(category));
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let map = ExtensionMap::builtin();
        assert_eq!(map.category_for("JPG"), Some("images"));
        assert_eq!(map.category_for("Pdf"), Some("documents"));
    }

    #[test]
    fn test_empty_extension_never_matches() {
        let map = ExtensionMap::builtin();
        assert_eq!(map.category_for(""), None);
    }

    #[test]
    fn test_from_categories() {
        let map = ExtensionMap::from_categories([("images", vec!["jpg"]), ("docs", vec!["txt"])])
            .unwrap();

        assert_eq!(map.category_for("jpg"), Some("images"));
        assert_eq!(map.category_for("txt"), Some("docs"));
        assert_eq!(map.category_for("png"), None);
        assert!(map.is_category("docs"));
        assert!(map.is_category("images"));
        assert!(!map.is_category("audio"));
    }

    #[test]
    fn test_extensions_are_normalized() {
        let map = ExtensionMap::from_categories([("images", vec![".JPG", " png "])]).unwrap();
        assert_eq!(map.category_for("jpg"), Some("images"));
        assert_eq!(map.category_for("png"), Some("images"));
    }

    #[test]
    fn test_category_without_extensions_is_still_reserved() {
        let map = ExtensionMap::from_categories([("misc", Vec::<&str>::new())]).unwrap();
        assert!(map.is_category("misc"));
        assert_eq!(map.category_for("misc"), None);
    }

    #[test]
    fn test_duplicate_extension_is_rejected() {
        let result =
            ExtensionMap::from_categories([("images", vec!["jpg"]), ("photos", vec!["JPG"])]);
        assert_eq!(
            result,
            Err(MappingError::DuplicateExtension {
                extension: "jpg".to_string(),
                first: "images".to_string(),
                second: "photos".to_string(),
            })
        );
    }

    #[test]
    fn test_same_mapping_twice_is_accepted() {
        let map = ExtensionMap::from_categories([("images", vec!["jpg", "jpg"])]).unwrap();
        assert_eq!(map.category_for("jpg"), Some("images"));
    }

    #[test]
    fn test_invalid_category_names() {
        for name in ["", "..", "a/b", "a\\b"] {
            let result = ExtensionMap::from_categories([(name, vec!["jpg"])]);
            assert!(
                matches!(result, Err(MappingError::InvalidCategoryName(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_empty_extension_is_rejected() {
        let result = ExtensionMap::from_categories([("images", vec!["."])]);
        assert!(matches!(result, Err(MappingError::EmptyExtension { .. })));
    }
}
