//! filesorter - sort files into category subfolders by extension
//!
//! This library walks a directory tree, moves each file whose extension is
//! mapped to a category into a `<category>/` subfolder next to it, and descends
//! into plain subdirectories while skipping its own output folders. Runs are
//! journaled so they can be undone, and can be previewed with a dry run.

pub mod cli;
pub mod config;
pub mod extension_map;
pub mod history;
pub mod logging;
pub mod output;
pub mod sorter;
pub mod undo;

pub use config::{CompiledConfig, CompiledFilters, ConfigError, SorterConfig};
pub use extension_map::{ExtensionMap, MappingError};
pub use history::{HistoryError, Operation, OperationLog};
pub use sorter::{SortError, SortReport, Sorter};
pub use undo::{UndoManager, UndoReport};

pub use cli::{RunStatus, SortCommand, run_command};
