// src/transform/rename.rs

use std::path::PathBuf;

use tracing::warn;

use crate::transform::{AssetFile, Transform, TransformContext, TransformError};

/// Give every file in the stream one fixed output name.
///
/// When several files collapse onto the same name the last one (in path
/// order) is kept.
#[derive(Debug, Clone)]
pub struct Rename {
    name: String,
}

impl Rename {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Transform for Rename {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn apply(
        &self,
        files: Vec<AssetFile>,
        _ctx: &TransformContext<'_>,
    ) -> Result<Vec<AssetFile>, TransformError> {
        if files.len() > 1 {
            let sources: Vec<_> = files.iter().map(|f| f.source.display().to_string()).collect();
            warn!(
                target = %self.name,
                ?sources,
                "several files renamed to the same output, keeping the last"
            );
        }

        Ok(files
            .into_iter()
            .last()
            .map(|mut file| {
                file.relative = PathBuf::from(&self.name);
                file
            })
            .into_iter()
            .collect())
    }
}
