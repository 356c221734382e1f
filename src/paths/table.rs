// src/paths/table.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{Result, SitepipeError};
use crate::paths::GlobPattern;
use crate::types::AssetCategory;

/// `[paths]` section.
///
/// ```toml
/// [paths]
/// source_root = "src"
/// build_root = "dist"
///
/// [paths.scripts]
/// src = ["src/assets/js/main.js"]
/// ```
///
/// Every category not overridden gets the default layout below the roots.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub source_root: String,
    pub build_root: String,
    #[serde(flatten)]
    pub overrides: BTreeMap<AssetCategory, CategoryOverride>,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            source_root: "src".to_string(),
            build_root: "dist".to_string(),
            overrides: BTreeMap::new(),
        }
    }
}

/// `[paths.<category>]` override. Unset fields keep the default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryOverride {
    pub src: Option<Vec<String>>,
    pub build: Option<String>,
    pub watch: Option<Vec<String>>,
}

/// Compiled globs and output directory of one category.
#[derive(Debug, Clone)]
pub struct CategoryPaths {
    pub source: GlobPattern,
    pub output: PathBuf,
    pub watch: GlobPattern,
}

/// Immutable mapping from asset category to source globs, output directory
/// and watch globs. All paths are relative to the project root.
#[derive(Debug, Clone)]
pub struct PathTable {
    source_root: PathBuf,
    build_root: PathBuf,
    entries: BTreeMap<AssetCategory, CategoryPaths>,
}

struct RawEntry {
    src: Vec<String>,
    build: String,
    watch: Vec<String>,
}

fn raw(src: &[String], build: String, watch: &[String]) -> RawEntry {
    RawEntry {
        src: src.to_vec(),
        build,
        watch: watch.to_vec(),
    }
}

/// The stock front-end layout.
fn default_entries(src: &str, dist: &str) -> BTreeMap<AssetCategory, RawEntry> {
    let assets = format!("{src}/assets");
    let out = format!("{dist}/assets");
    let one = |p: String| vec![p];

    let images = vec![
        format!("{assets}/img/**/*.*"),
        format!("!{assets}/img/svg/**/*.*"),
    ];
    let fonts = one(format!("{assets}/fonts/**/*.{{ttf,woff,woff2,eot,svg}}"));
    let js = one(format!("{assets}/js/**/*.*"));
    let svg = one(format!("{assets}/img/svg/*.svg"));
    let sprite = one(format!("{assets}/img/svg/sprite/*.svg"));
    let by_bower = one(format!("{assets}/vendors/by_bower/**/*.*"));
    let by_hands = one(format!("{assets}/vendors/by_hands/**/*.*"));
    let templates = one(format!("{src}/templates/**/*.html"));

    BTreeMap::from([
        (
            AssetCategory::Sites,
            raw(
                &one(format!("{src}/sites/**/*.html")),
                format!("{dist}/sites"),
                &one(format!("{src}/sites/**/*.*")),
            ),
        ),
        (
            AssetCategory::Templates,
            raw(&templates, format!("{dist}/sites"), &templates),
        ),
        (
            AssetCategory::Styles,
            raw(
                &one(format!("{assets}/css/main.scss")),
                format!("{out}/css"),
                &one(format!("{assets}/css/**/*.*")),
            ),
        ),
        (AssetCategory::Scripts, raw(&js, format!("{out}/js"), &js)),
        (AssetCategory::Images, raw(&images, format!("{out}/img"), &images)),
        (AssetCategory::VectorGraphics, raw(&svg, format!("{out}/img/svg"), &svg)),
        (AssetCategory::VectorSprite, raw(&sprite, format!("{out}/img/svg"), &sprite)),
        (AssetCategory::Fonts, raw(&fonts, format!("{out}/fonts"), &fonts)),
        (AssetCategory::VendorsA, raw(&by_bower, format!("{out}/vendors"), &by_bower)),
        (AssetCategory::VendorsB, raw(&by_hands, format!("{out}/vendors"), &by_hands)),
    ])
}

impl PathTable {
    /// Build the table from the `[paths]` section, compiling every glob.
    pub fn from_section(section: &PathsSection) -> Result<Self> {
        let source_root = section.source_root.trim_end_matches('/');
        let build_root = section.build_root.trim_end_matches('/');
        let mut raw_entries = default_entries(source_root, build_root);

        for (category, over) in section.overrides.iter() {
            let Some(entry) = raw_entries.get_mut(category) else {
                continue;
            };
            if let Some(src) = &over.src {
                entry.src = src.clone();
            }
            if let Some(build) = &over.build {
                entry.build = build.clone();
            }
            if let Some(watch) = &over.watch {
                entry.watch = watch.clone();
            }
        }

        let mut entries = BTreeMap::new();
        for (category, entry) in raw_entries {
            entries.insert(
                category,
                CategoryPaths {
                    source: GlobPattern::new(&entry.src)?,
                    output: PathBuf::from(entry.build.trim_end_matches('/')),
                    watch: GlobPattern::new(&entry.watch)?,
                },
            );
        }

        let table = Self {
            source_root: PathBuf::from(source_root),
            build_root: PathBuf::from(build_root),
            entries,
        };
        table.check_outputs_under_build_root()?;
        Ok(table)
    }

    fn check_outputs_under_build_root(&self) -> Result<()> {
        for (category, paths) in self.entries.iter() {
            if !paths.output.starts_with(&self.build_root) {
                return Err(SitepipeError::ConfigError(format!(
                    "output dir {:?} of category '{}' is not inside build_root {:?}",
                    paths.output, category, self.build_root
                )));
            }
        }
        Ok(())
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn build_root(&self) -> &Path {
        &self.build_root
    }

    pub fn source_globs(&self, category: AssetCategory) -> &GlobPattern {
        &self.entry(category).source
    }

    pub fn output_dir(&self, category: AssetCategory) -> &Path {
        &self.entry(category).output
    }

    pub fn watch_globs(&self, category: AssetCategory) -> &GlobPattern {
        &self.entry(category).watch
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetCategory, &CategoryPaths)> {
        self.entries.iter().map(|(c, p)| (*c, p))
    }

    fn entry(&self, category: AssetCategory) -> &CategoryPaths {
        // Every category is inserted by `default_entries`.
        &self.entries[&category]
    }
}
