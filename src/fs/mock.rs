// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

/// In-memory filesystem for tests.
///
/// Paths are normalised by dropping `.` components, so `./src/a.js` and
/// `src/a.js` name the same entry; the root is `.`. Directories exist
/// implicitly as soon as a file below them is added.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<BTreeMap<PathBuf, Vec<u8>>>>,
}

const MOCK_ROOT: &str = "/project";

fn key(path: &Path) -> PathBuf {
    let normalised: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if normalised.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalised
    }
}

fn is_below(path: &Path, dir: &Path) -> bool {
    dir == Path::new(".") || (path != dir && path.starts_with(dir))
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut files = self.files.lock().unwrap();
        files.insert(key(path.as_ref()), content.into());
    }

    /// Snapshot of every file currently stored, keyed by normalised path.
    pub fn snapshot(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        self.files.lock().unwrap().clone()
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let files = self.files.lock().unwrap();
        files
            .get(&key(path))
            .cloned()
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.contains_key(&key(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let dir = key(path);
        if dir == Path::new(".") {
            return true;
        }
        let files = self.files.lock().unwrap();
        files.keys().any(|p| is_below(p, &dir))
    }

    /// The mock root `.` canonicalises to `/project`; `..` is resolved
    /// lexically, so paths may escape it.
    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        let mut out = PathBuf::from(MOCK_ROOT);
        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    out.pop();
                }
                Component::Normal(part) => out.push(part),
                Component::RootDir | Component::Prefix(_) => out = PathBuf::from("/"),
            }
        }
        match out.strip_prefix(MOCK_ROOT) {
            Ok(rel) if !self.exists(rel) && !rel.as_os_str().is_empty() => {
                Err(anyhow!("No such file or directory: {:?}", path))
            }
            _ => Ok(out),
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let dir = key(path);
        let files = self.files.lock().unwrap();
        let mut children: Vec<PathBuf> = Vec::new();

        for file in files.keys().filter(|p| is_below(p, &dir)) {
            let rel = if dir == Path::new(".") {
                file.as_path()
            } else {
                file.strip_prefix(&dir).unwrap_or(file)
            };
            if let Some(first) = rel.components().next() {
                let child = path.join(first.as_os_str());
                if !children.contains(&child) {
                    children.push(child);
                }
            }
        }

        if children.is_empty() {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        Ok(children)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let dir = key(path);
        let mut files = self.files.lock().unwrap();
        files.retain(|p, _| !is_below(p, &dir));
        Ok(())
    }
}
