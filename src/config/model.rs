// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::paths::{PathTable, PathsSection};
use crate::types::{HashStorageMode, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from a TOML file (before validation).
///
/// ```toml
/// [config]
/// triggered_while_running_behaviour = "queue"
///
/// [paths]
/// source_root = "src"
/// build_root = "dist"
///
/// [styles]
/// entry_delay_ms = 600
///
/// [template.data]
/// title = "Landing"
///
/// [server]
/// port = 9000
/// ```
///
/// All sections are optional and default to the stock front-end layout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub styles: StylesSection,
    #[serde(default)]
    pub scripts: ScriptsSection,
    #[serde(default)]
    pub sprite: SpriteSection,
    #[serde(default)]
    pub svg: SvgSection,
    #[serde(default)]
    pub images: ImagesSection,
    #[serde(default)]
    pub template: TemplateSection,
    #[serde(default)]
    pub server: ServerSection,
}

/// Validated configuration.
///
/// Built once at startup via `ConfigFile::try_from(raw)` and shared
/// read-only (behind an `Arc`) by every task, the watcher and the server.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub styles: StylesSection,
    pub scripts: ScriptsSection,
    pub sprite: SpriteSection,
    pub svg: SvgSection,
    pub images: ImagesSection,
    pub template: TemplateSection,
    pub server: ServerSection,
    paths: PathTable,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile, paths: PathTable) -> Self {
        Self {
            config: raw.config,
            styles: raw.styles,
            scripts: raw.scripts,
            sprite: raw.sprite,
            svg: raw.svg,
            images: raw.images,
            template: raw.template,
            server: raw.server,
            paths,
        }
    }

    /// Configuration with every default applied.
    pub fn defaults() -> crate::errors::Result<Self> {
        Self::try_from(RawConfigFile::default())
    }

    /// The compiled path table.
    pub fn paths(&self) -> &PathTable {
        &self.paths
    }

    /// Globs of build output paths whose change the dev server pushes to
    /// clients. Defaults to everything below the build root.
    pub fn server_files(&self) -> Vec<String> {
        match &self.server.files {
            Some(files) => files.clone(),
            None => vec![format!("{}/**/*", self.paths.build_root().display())],
        }
    }
}

/// `[config]` section: watch-mode behaviour.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigSection {
    /// `"queue"` (default) or `"skip"`.
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Only trigger a task when the aggregated content of its watched
    /// files actually changed.
    pub use_hash: bool,

    /// `"memory"` (default) or `"file"` (`.sitepipe/hashes`).
    pub hash_storage: HashStorageMode,
}

/// `[styles]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StylesSection {
    /// Delay before the styles task starts, so editors that save in
    /// several steps do not produce a broken intermediate build.
    pub entry_delay_ms: u64,
    pub output_name: String,
    /// Source map directory, relative to the stylesheet output directory.
    pub maps_dir: String,
    /// Browserslist queries driving vendor prefixing.
    pub browsers: Vec<String>,
    pub minify: bool,
}

impl StylesSection {
    pub fn entry_delay(&self) -> Duration {
        Duration::from_millis(self.entry_delay_ms)
    }
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            entry_delay_ms: 600,
            output_name: "main.min.css".to_string(),
            maps_dir: "maps".to_string(),
            browsers: vec![
                "last 1 version".to_string(),
                "last 2 Chrome versions".to_string(),
                "last 2 Firefox versions".to_string(),
                "last 2 Opera versions".to_string(),
                "last 2 Edge versions".to_string(),
            ],
            minify: false,
        }
    }
}

/// `[scripts]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptsSection {
    pub output_name: String,
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            output_name: "common.min.js".to_string(),
        }
    }
}

/// `[sprite]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpriteSection {
    pub output_name: String,
}

impl Default for SpriteSection {
    fn default() -> Self {
        Self {
            output_name: "sprite.svg".to_string(),
        }
    }
}

/// `[svg]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SvgSection {
    /// Decimal places kept in numeric attribute values.
    pub float_precision: u8,
}

impl Default for SvgSection {
    fn default() -> Self {
        Self { float_precision: 2 }
    }
}

/// `[images]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesSection {
    /// Lossless PNG recompression. Off by default: images are copied as-is.
    pub optimize: bool,
}

/// `[template]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateSection {
    /// Values available to `<%= name %>` placeholders in pages.
    pub data: toml::Table,
}

/// `[server]` section: the development server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Serve directory listings for directories without `index.html`.
    pub directory: bool,
    /// Label attached to every server log line.
    pub log_prefix: String,
    /// Output globs that cause a reload push; `None` means the whole build root.
    pub files: Option<Vec<String>>,
    /// WebSocket port for live-reload clients.
    pub reload_port: u16,
    /// Directory to serve; `None` means the build root.
    pub base_dir: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9000,
            directory: true,
            log_prefix: "frontend".to_string(),
            files: None,
            reload_port: 35729,
            base_dir: None,
        }
    }
}
