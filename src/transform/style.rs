// src/transform/style.rs

//! Stylesheet stages: Sass compilation with `grass`, then
//! browserslist-driven vendor prefixing with source maps via `lightningcss`.

use std::io;
use std::path::Path;

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use tracing::debug;

use crate::errors::{Result, SitepipeError};
use crate::fs::FileSystem;
use crate::transform::{AssetFile, Transform, TransformContext, TransformError};

const COMPILE: &str = "compile-styles";
const PREFIX: &str = "vendor-prefix";

/// Compile SCSS entry stylesheets to plain CSS.
///
/// Imports resolve relative to the importing file and to the directory of
/// the entry stylesheet. Partials (`_*.scss`) are never compiled on their
/// own.
#[derive(Debug, Clone, Default)]
pub struct CompileStyles;

/// Lets the Sass compiler read imports through the task's filesystem.
#[derive(Debug)]
struct SassFs<'a>(&'a dyn FileSystem);

impl grass::Fs for SassFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        self.0.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.0.is_file(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.0.read(path).map_err(|e| io::Error::other(format!("{e:#}")))
    }
}

impl CompileStyles {
    fn compile(
        &self,
        fs: &dyn FileSystem,
        source: &Path,
        scss: &str,
    ) -> std::result::Result<String, TransformError> {
        let sass_fs = SassFs(fs);
        let entry_dir = source.parent().unwrap_or(Path::new(""));
        let options = grass::Options::default()
            .fs(&sass_fs)
            .style(grass::OutputStyle::Expanded)
            .load_path(entry_dir);

        grass::from_string(scss.to_string(), &options)
            .map_err(|e| TransformError::rejected(COMPILE, source, e.to_string()))
    }
}

impl Transform for CompileStyles {
    fn name(&self) -> &'static str {
        COMPILE
    }

    fn apply(
        &self,
        files: Vec<AssetFile>,
        ctx: &TransformContext<'_>,
    ) -> std::result::Result<Vec<AssetFile>, TransformError> {
        let mut out = Vec::new();
        for mut file in files {
            if is_partial(&file.relative) {
                debug!(path = ?file.source, "skipping partial");
                continue;
            }

            let css = self.compile(ctx.fs, &file.source, file.text(COMPILE)?)?;
            file.contents = css.into_bytes();
            file.relative.set_extension("css");
            out.push(file);
        }
        Ok(out)
    }
}

fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

/// Add vendor prefixes for the configured browserslist queries and attach
/// a source map to every stylesheet.
#[derive(Debug, Clone)]
pub struct VendorPrefix {
    targets: Targets,
    minify: bool,
}

impl VendorPrefix {
    pub fn from_queries(queries: &[String], minify: bool) -> Result<Self> {
        let browsers = Browsers::from_browserslist(queries.iter().map(String::as_str))
            .map_err(|e| SitepipeError::ConfigError(format!("[styles].browsers: {e}")))?;
        Ok(Self {
            targets: Targets {
                browsers,
                ..Targets::default()
            },
            minify,
        })
    }

    /// Prefixed CSS and its source map (JSON).
    fn prefix(&self, source: &Path, css: &str) -> std::result::Result<(String, String), TransformError> {
        let reject = |msg: String| TransformError::rejected(PREFIX, source, msg);
        let source_name = source.display().to_string();
        let project_root = source
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        let mut sheet = StyleSheet::parse(
            css,
            ParserOptions {
                filename: source_name.clone(),
                ..ParserOptions::default()
            },
        )
        .map_err(|e| reject(e.to_string()))?;

        sheet
            .minify(MinifyOptions {
                targets: self.targets,
                ..MinifyOptions::default()
            })
            .map_err(|e| reject(e.to_string()))?;

        let mut map = SourceMap::new(&project_root);
        map.add_source(&source_name);
        map.set_source_content(0, css)
            .map_err(|e| reject(e.to_string()))?;

        let printed = sheet
            .to_css(PrinterOptions {
                minify: self.minify,
                source_map: Some(&mut map),
                targets: self.targets,
                ..PrinterOptions::default()
            })
            .map_err(|e| reject(e.to_string()))?;

        let json = map.to_json(None).map_err(|e| reject(e.to_string()))?;
        Ok((printed.code, json))
    }
}

impl Transform for VendorPrefix {
    fn name(&self) -> &'static str {
        PREFIX
    }

    fn apply(
        &self,
        files: Vec<AssetFile>,
        _ctx: &TransformContext<'_>,
    ) -> std::result::Result<Vec<AssetFile>, TransformError> {
        files
            .into_iter()
            .map(|mut file| {
                let (code, map) = self.prefix(&file.source, file.text(PREFIX)?)?;
                file.contents = code.into_bytes();
                file.source_map = Some(map);
                Ok(file)
            })
            .collect()
    }
}
