#![allow(dead_code)]

use sitepipe::config::{ConfigFile, RawConfigFile};
use sitepipe::paths::CategoryOverride;
use sitepipe::types::{AssetCategory, HashStorageMode, TriggerWhileRunningBehaviour};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the defaults with a zero styles delay, so tests do not
/// sleep before every styles run.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.styles.entry_delay_ms = 0;
        Self { config }
    }

    pub fn with_roots(mut self, source_root: &str, build_root: &str) -> Self {
        self.config.paths.source_root = source_root.to_string();
        self.config.paths.build_root = build_root.to_string();
        self
    }

    pub fn with_category_src(mut self, category: AssetCategory, patterns: &[&str]) -> Self {
        let entry = self.config.paths.overrides.entry(category).or_default();
        entry.src = Some(patterns.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn with_category_build(mut self, category: AssetCategory, dir: &str) -> Self {
        let entry: &mut CategoryOverride = self.config.paths.overrides.entry(category).or_default();
        entry.build = Some(dir.to_string());
        self
    }

    pub fn with_template_value(mut self, key: &str, value: &str) -> Self {
        self.config
            .template
            .data
            .insert(key.to_string(), toml::Value::String(value.to_string()));
        self
    }

    pub fn with_styles_delay_ms(mut self, ms: u64) -> Self {
        self.config.styles.entry_delay_ms = ms;
        self
    }

    pub fn with_behaviour(mut self, behaviour: TriggerWhileRunningBehaviour) -> Self {
        self.config.config.triggered_while_running_behaviour = behaviour;
        self
    }

    pub fn with_use_hash(mut self, storage: HashStorageMode) -> Self {
        self.config.config.use_hash = true;
        self.config.config.hash_storage = storage;
        self
    }

    pub fn with_image_optimization(mut self, optimize: bool) -> Self {
        self.config.images.optimize = optimize;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
