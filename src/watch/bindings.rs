// src/watch/bindings.rs

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Result;

use crate::fs::FileSystem;
use crate::paths::{collect_sources, GlobPattern, PathTable};
use crate::tasks::TaskRegistry;
use crate::types::TaskName;

/// Which task a change under some watch globs re-runs.
///
/// Each category keeps its own compiled pattern, so a negation in one
/// category never affects another.
#[derive(Debug, Clone)]
pub struct WatchBinding {
    task: TaskName,
    patterns: Vec<GlobPattern>,
}

impl WatchBinding {
    pub fn new(task: TaskName, patterns: Vec<GlobPattern>) -> Self {
        Self { task, patterns }
    }

    pub fn task(&self) -> TaskName {
        self.task
    }

    /// Whether `rel_path` (forward slashes, relative to the project root)
    /// is watched by this binding.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(rel_path))
    }

    /// Every existing file this binding watches, sorted.
    pub fn watched_files(&self, fs: &dyn FileSystem, root: &std::path::Path) -> Result<Vec<PathBuf>> {
        let mut files = BTreeSet::new();
        for pattern in &self.patterns {
            for file in collect_sources(fs, root, pattern)? {
                files.insert(file.path);
            }
        }
        Ok(files.into_iter().collect())
    }
}

/// One binding per registered task, from the watch globs of the task's
/// watch categories.
pub fn bindings_from_registry(registry: &TaskRegistry, paths: &PathTable) -> Vec<WatchBinding> {
    registry
        .iter()
        .map(|task| {
            let patterns = task
                .watch_categories()
                .iter()
                .map(|c| paths.watch_globs(*c).clone())
                .collect();
            WatchBinding::new(task.name(), patterns)
        })
        .collect()
}

/// Tasks whose bindings match any of `rel_paths`, each at most once.
pub fn matching_tasks<'a>(
    bindings: &[WatchBinding],
    rel_paths: impl IntoIterator<Item = &'a str>,
) -> BTreeSet<TaskName> {
    let mut tasks = BTreeSet::new();
    for rel in rel_paths {
        for binding in bindings.iter().filter(|b| b.matches(rel)) {
            tasks.insert(binding.task());
        }
    }
    tasks
}
