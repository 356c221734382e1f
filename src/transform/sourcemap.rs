// src/transform/sourcemap.rs

use std::path::Path;

use crate::transform::{AssetFile, Transform, TransformContext, TransformError};

const STAGE: &str = "source-maps";

/// Write attached source maps as companion files in `maps_dir` (relative
/// to each file) and link them with a `sourceMappingURL` comment.
#[derive(Debug, Clone)]
pub struct EmitSourceMaps {
    maps_dir: String,
}

impl EmitSourceMaps {
    pub fn new(maps_dir: impl Into<String>) -> Self {
        Self {
            maps_dir: maps_dir.into(),
        }
    }
}

impl Transform for EmitSourceMaps {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn apply(
        &self,
        files: Vec<AssetFile>,
        _ctx: &TransformContext<'_>,
    ) -> Result<Vec<AssetFile>, TransformError> {
        let mut out = Vec::with_capacity(files.len() * 2);

        for mut file in files {
            let Some(map) = file.source_map.take() else {
                out.push(file);
                continue;
            };

            let file_name = file
                .relative
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| TransformError::rejected(STAGE, &file.source, "output has no file name"))?;

            let mut json: serde_json::Value = serde_json::from_str(&map)
                .map_err(|e| TransformError::rejected(STAGE, &file.source, e.to_string()))?;
            if let Some(obj) = json.as_object_mut() {
                obj.insert("file".to_string(), serde_json::Value::String(file_name.clone()));
            }
            let json = serde_json::to_vec(&json)
                .map_err(|e| TransformError::rejected(STAGE, &file.source, e.to_string()))?;

            let map_rel = Path::new(&self.maps_dir).join(format!("{file_name}.map"));
            let parent = file.relative.parent().map(Path::to_path_buf).unwrap_or_default();

            let mut contents = file.contents;
            if !contents.ends_with(b"\n") {
                contents.push(b'\n');
            }
            contents.extend_from_slice(
                format!("/*# sourceMappingURL={} */\n", url_path(&map_rel)).as_bytes(),
            );

            let map_file = AssetFile {
                source: file.source.clone(),
                relative: parent.join(&map_rel),
                contents: json,
                source_map: None,
            };
            out.push(AssetFile { contents, ..file });
            out.push(map_file);
        }

        Ok(out)
    }
}

fn url_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
