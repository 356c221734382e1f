// src/config/mod.rs

//! Configuration: TOML model, loading and validation.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    ConfigFile, ConfigSection, ImagesSection, RawConfigFile, ScriptsSection, ServerSection,
    SpriteSection, StylesSection, SvgSection, TemplateSection,
};
