// src/tasks/clean.rs

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::ConfigFile;
use crate::errors::{Result, SitepipeError};
use crate::fs::FileSystem;

/// Recursively delete the build root.
///
/// Refuses when the build root resolves to the project root or outside
/// it, or when it contains the source root. Returns the removed directory,
/// or `None` when there was nothing to remove.
pub fn clean(config: &ConfigFile, fs: &dyn FileSystem, project_root: &Path) -> Result<Option<PathBuf>> {
    let paths = config.paths();
    let build_root = project_root.join(paths.build_root());

    if !fs.exists(&build_root) {
        info!(path = ?paths.build_root(), "build root does not exist, nothing to clean");
        return Ok(None);
    }

    let root = fs.canonicalize(project_root)?;
    let build = fs.canonicalize(&build_root)?;

    if build == root || !build.starts_with(&root) {
        return Err(SitepipeError::ConfigError(format!(
            "refusing to clean {:?}: it is not a directory inside the project root {:?}",
            build, root
        )));
    }

    let source_root = project_root.join(paths.source_root());
    if fs.exists(&source_root) {
        let source = fs.canonicalize(&source_root)?;
        if source.starts_with(&build) {
            return Err(SitepipeError::ConfigError(format!(
                "refusing to clean {:?}: it contains the source root {:?}",
                build, source
            )));
        }
    } else {
        warn!(path = ?paths.source_root(), "source root does not exist");
    }

    fs.remove_dir_all(&build_root)?;
    info!(path = ?paths.build_root(), "build root removed");
    Ok(Some(build_root))
}
