// src/watch/hash.rs

//! Content hashes used to suppress triggers when watched files were
//! touched but not changed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::types::TaskName;

/// Relative path (from the project root) of the persisted hash file.
pub const HASH_FILE_PATH: &str = ".sitepipe/hashes";

/// Hash of a single file's contents.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let bytes = fs
        .read(path)
        .with_context(|| format!("reading file for hashing: {:?}", path))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Aggregate hash over `(path, file hash)` pairs. The pairs must be sorted
/// by path; renaming a file changes the result.
pub fn compute_aggregate_hash(entries: &[(PathBuf, String)]) -> String {
    let mut hasher = Hasher::new();
    for (path, hash) in entries {
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        hasher.update(hash.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Storage for the last seen aggregate hash per task.
pub trait HashStore: Send + Sync {
    fn load(&self, task: TaskName) -> Result<Option<String>>;
    fn save(&mut self, task: TaskName, hash: &str) -> Result<()>;
}

/// Hashes kept for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: BTreeMap<TaskName, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, task: TaskName) -> Result<Option<String>> {
        Ok(self.map.get(&task).cloned())
    }

    fn save(&mut self, task: TaskName, hash: &str) -> Result<()> {
        self.map.insert(task, hash.to_string());
        debug!(%task, %hash, "stored task hash (memory)");
        Ok(())
    }
}

/// Hashes persisted in `<root>/.sitepipe/hashes`, one `task hash` per line,
/// so an unchanged tree does not retrigger after a restart.
#[derive(Debug)]
pub struct FileHashStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileHashStore {
    pub fn new(root: &Path, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: root.join(HASH_FILE_PATH),
            fs,
        }
    }

    fn load_all(&self) -> Result<BTreeMap<TaskName, String>> {
        if !self.fs.is_file(&self.path) {
            return Ok(BTreeMap::new());
        }

        let text = self.fs.read_to_string(&self.path)?;
        let mut map = BTreeMap::new();
        for line in text.lines() {
            let Some((name, hash)) = line.trim().split_once(char::is_whitespace) else {
                continue;
            };
            // Entries of tasks that no longer exist are dropped.
            if let Ok(task) = name.parse::<TaskName>() {
                map.insert(task, hash.trim().to_string());
            }
        }
        Ok(map)
    }

    fn save_all(&self, map: &BTreeMap<TaskName, String>) -> Result<()> {
        let mut text = String::new();
        for (task, hash) in map {
            text.push_str(&format!("{task} {hash}\n"));
        }
        self.fs.write(&self.path, text.as_bytes())
    }
}

impl HashStore for FileHashStore {
    fn load(&self, task: TaskName) -> Result<Option<String>> {
        Ok(self.load_all()?.remove(&task))
    }

    fn save(&mut self, task: TaskName, hash: &str) -> Result<()> {
        let mut map = self.load_all()?;
        map.insert(task, hash.to_string());
        self.save_all(&map)?;
        info!(%task, %hash, "stored task hash (file)");
        Ok(())
    }
}
