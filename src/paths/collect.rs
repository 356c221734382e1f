// src/paths/collect.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::fs::FileSystem;
use crate::paths::GlobPattern;

/// A source file selected by a [`GlobPattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path as seen by the filesystem (`root` joined with `rel`).
    pub path: PathBuf,
    /// Path relative to the project root, forward slashes.
    pub rel: String,
    /// Path relative to the glob base; this is where the file lands inside
    /// the category output directory.
    pub relative_to_base: PathBuf,
}

/// Convert a path into a string relative to `root`, with forward slashes.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

/// Collect every file under `root` selected by `pattern`, sorted by path.
///
/// Only the base directories of the positive patterns are walked; a base
/// that does not exist simply contributes nothing.
pub fn collect_sources(
    fs: &dyn FileSystem,
    root: &Path,
    pattern: &GlobPattern,
) -> Result<Vec<SourceFile>> {
    let mut found: BTreeMap<String, SourceFile> = BTreeMap::new();

    for base in pattern.bases() {
        let start = root.join(base);
        if !fs.is_dir(&start) {
            continue;
        }

        let mut stack = vec![start];
        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                if fs.is_dir(&path) {
                    stack.push(path);
                    continue;
                }
                if !fs.is_file(&path) {
                    continue;
                }
                let Some(rel) = relative_str(root, &path) else {
                    continue;
                };
                if found.contains_key(&rel) || !pattern.matches(&rel) {
                    continue;
                }
                let Some(file_base) = pattern.base_for(&rel) else {
                    continue;
                };
                let relative_to_base = Path::new(&rel)
                    .strip_prefix(file_base)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| PathBuf::from(&rel));

                found.insert(
                    rel.clone(),
                    SourceFile {
                        path,
                        rel,
                        relative_to_base,
                    },
                );
            }
        }
    }

    Ok(found.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn collects_sorted_matches_relative_to_base() {
        let fs = MockFileSystem::new();
        fs.add_file("src/img/b.png", "b");
        fs.add_file("src/img/nested/a.png", "a");
        fs.add_file("src/img/svg/icon.svg", "svg");
        fs.add_file("src/js/app.js", "js");

        let pattern = GlobPattern::new(["src/img/**/*.*", "!src/img/svg/**/*.*"]).unwrap();
        let files = collect_sources(&fs, Path::new("."), &pattern).unwrap();

        let rels: Vec<&str> = files.iter().map(|f| f.rel.as_str()).collect();
        assert_eq!(rels, vec!["src/img/b.png", "src/img/nested/a.png"]);
        assert_eq!(files[1].relative_to_base, PathBuf::from("nested/a.png"));
    }

    #[test]
    fn missing_base_matches_nothing() {
        let fs = MockFileSystem::new();
        fs.add_file("other/file.txt", "x");
        let pattern = GlobPattern::new(["src/fonts/**/*.ttf"]).unwrap();
        assert!(collect_sources(&fs, Path::new("."), &pattern).unwrap().is_empty());
    }
}
