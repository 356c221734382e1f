// src/paths/mod.rs

//! Path table and glob handling.
//!
//! - [`pattern`] compiles ordered, negatable glob lists.
//! - [`table`] maps each asset category to its source globs, output
//!   directory and watch globs.
//! - [`collect`] walks the source tree and selects files for a task.

pub mod collect;
pub mod pattern;
pub mod table;

pub use collect::{collect_sources, relative_str, SourceFile};
pub use pattern::{glob_base, GlobPattern};
pub use table::{CategoryOverride, CategoryPaths, PathTable, PathsSection};
