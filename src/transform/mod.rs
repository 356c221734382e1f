// src/transform/mod.rs

//! File-stream transforms composed by the build tasks.
//!
//! Every stage takes the whole stream of [`AssetFile`]s and returns a new
//! stream, so stages that merge files (sprite assembly) or rename them fit
//! the same shape as per-file rewrites.

use std::fmt::Debug;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::fs::FileSystem;

pub mod image;
pub mod include;
pub mod rename;
pub mod script;
pub mod sourcemap;
pub mod sprite;
pub mod style;
pub mod svg;
pub mod template;

pub use image::OptimizeImages;
pub use include::ResolveIncludes;
pub use rename::Rename;
pub use script::MinifyScript;
pub use sourcemap::EmitSourceMaps;
pub use sprite::AssembleSprite;
pub use style::{CompileStyles, VendorPrefix};
pub use svg::{OptimizeSvg, StripDimensions};
pub use template::TemplateVariables;

/// One file flowing through a task pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    /// Where the file was read from.
    pub source: PathBuf,
    /// Destination path relative to the task's output directory.
    pub relative: PathBuf,
    pub contents: Vec<u8>,
    /// Source map (v3 JSON) attached by a stage that can produce one.
    pub source_map: Option<String>,
}

impl AssetFile {
    pub fn new(source: impl Into<PathBuf>, relative: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        Self {
            source: source.into(),
            relative: relative.into(),
            contents,
            source_map: None,
        }
    }

    /// Contents as UTF-8, or a rejection naming `stage`.
    pub fn text(&self, stage: &'static str) -> Result<&str, TransformError> {
        std::str::from_utf8(&self.contents)
            .map_err(|e| TransformError::rejected(stage, &self.source, format!("not valid UTF-8: {e}")))
    }
}

/// Failure of one pipeline stage.
#[derive(Error, Debug)]
pub enum TransformError {
    /// The stage rejected its input (syntax error, missing include, ...).
    #[error("{stage}: {path}: {message}")]
    Rejected {
        stage: &'static str,
        path: String,
        message: String,
    },

    /// The stage could not read a file it depends on.
    #[error("{stage}: {path}: {source}")]
    Io {
        stage: &'static str,
        path: String,
        #[source]
        source: anyhow::Error,
    },
}

impl TransformError {
    pub fn rejected(stage: &'static str, path: &Path, message: impl Into<String>) -> Self {
        TransformError::Rejected {
            stage,
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    pub fn io(stage: &'static str, path: &Path, source: anyhow::Error) -> Self {
        TransformError::Io {
            stage,
            path: path.display().to_string(),
            source,
        }
    }
}

/// What a stage may touch besides the stream itself.
pub struct TransformContext<'a> {
    pub fs: &'a dyn FileSystem,
}

/// One pipeline stage.
pub trait Transform: Send + Sync + Debug {
    /// Short stage name used in logs and errors.
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        files: Vec<AssetFile>,
        ctx: &TransformContext<'_>,
    ) -> Result<Vec<AssetFile>, TransformError>;
}

/// Lexically resolve `.` and `..` components.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
