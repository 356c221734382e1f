// src/config/validate.rs

use std::path::Path;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SitepipeError};
use crate::paths::{GlobPattern, PathTable};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::SitepipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        // Compiles every category glob and checks output dirs.
        let paths = PathTable::from_section(&raw.paths)?;
        Ok(ConfigFile::new_unchecked(raw, paths))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_roots(cfg)?;
    validate_output_names(cfg)?;
    validate_svg(cfg)?;
    validate_server(cfg)?;
    Ok(())
}

fn validate_roots(cfg: &RawConfigFile) -> Result<()> {
    let source = Path::new(cfg.paths.source_root.trim_end_matches('/'));
    let build = Path::new(cfg.paths.build_root.trim_end_matches('/'));

    if build.as_os_str().is_empty() || build == Path::new(".") {
        return Err(SitepipeError::ConfigError(
            "[paths].build_root must name a directory below the project root".to_string(),
        ));
    }
    if source.starts_with(build) {
        return Err(SitepipeError::ConfigError(format!(
            "[paths].build_root {:?} must not equal or contain source_root {:?}",
            build, source
        )));
    }
    Ok(())
}

fn validate_output_names(cfg: &RawConfigFile) -> Result<()> {
    let names = [
        ("[styles].output_name", &cfg.styles.output_name),
        ("[styles].maps_dir", &cfg.styles.maps_dir),
        ("[scripts].output_name", &cfg.scripts.output_name),
        ("[sprite].output_name", &cfg.sprite.output_name),
    ];

    for (key, value) in names {
        if value.trim().is_empty() {
            return Err(SitepipeError::ConfigError(format!("{key} must not be empty")));
        }
        if value.contains(['/', '\\']) {
            return Err(SitepipeError::ConfigError(format!(
                "{key} must be a plain file name (got {value:?})"
            )));
        }
    }
    Ok(())
}

fn validate_svg(cfg: &RawConfigFile) -> Result<()> {
    if cfg.svg.float_precision > 8 {
        return Err(SitepipeError::ConfigError(format!(
            "[svg].float_precision must be <= 8 (got {})",
            cfg.svg.float_precision
        )));
    }
    Ok(())
}

fn validate_server(cfg: &RawConfigFile) -> Result<()> {
    let server = &cfg.server;
    if server.port == 0 {
        return Err(SitepipeError::ConfigError(
            "[server].port must be >= 1 (got 0)".to_string(),
        ));
    }
    if server.reload_port == server.port {
        return Err(SitepipeError::ConfigError(format!(
            "[server].reload_port must differ from port ({})",
            server.port
        )));
    }
    if let Some(files) = &server.files {
        GlobPattern::new(files)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssetCategory;

    fn parse(toml_src: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(toml_src)?;
        ConfigFile::try_from(raw)
    }

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.styles.entry_delay_ms, 600);
        assert_eq!(cfg.scripts.output_name, "common.min.js");
        assert_eq!(cfg.server.port, 9000);
        assert!(!cfg.images.optimize);
        assert_eq!(cfg.server_files(), vec!["dist/**/*".to_string()]);
    }

    #[test]
    fn category_override_is_parsed() {
        let cfg = parse(
            r#"
            [paths.scripts]
            src = ["src/assets/js/app.js"]
            "#,
        )
        .unwrap();
        let globs = cfg.paths().source_globs(AssetCategory::Scripts);
        assert!(globs.matches("src/assets/js/app.js"));
        assert!(!globs.matches("src/assets/js/other.js"));
    }

    #[test]
    fn rejects_output_name_with_separator() {
        let err = parse("[scripts]\noutput_name = \"js/app.js\"").unwrap_err();
        assert!(matches!(err, SitepipeError::ConfigError(msg) if msg.contains("[scripts]")));
    }

    #[test]
    fn rejects_clashing_ports() {
        let err = parse("[server]\nport = 35729").unwrap_err();
        assert!(matches!(err, SitepipeError::ConfigError(msg) if msg.contains("reload_port")));
    }

    #[test]
    fn rejects_build_root_containing_sources() {
        let err = parse("[paths]\nsource_root = \"dist/src\"").unwrap_err();
        assert!(matches!(err, SitepipeError::ConfigError(_)));
    }

    #[test]
    fn rejects_excessive_precision() {
        assert!(parse("[svg]\nfloat_precision = 12").is_err());
    }

    #[test]
    fn unknown_sections_and_behaviours_fail_to_parse() {
        assert!(matches!(parse("[nope]\nx = 1"), Err(SitepipeError::TomlError(_))));
        assert!(matches!(
            parse("[config]\ntriggered_while_running_behaviour = \"restart\""),
            Err(SitepipeError::TomlError(_))
        ));
    }
}
