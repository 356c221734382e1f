// src/tasks/registry.rs

use crate::errors::{Result, SitepipeError};
use crate::tasks::task::{Task, TaskEnv};
use crate::transform::{
    AssembleSprite, CompileStyles, EmitSourceMaps, MinifyScript, OptimizeImages, OptimizeSvg,
    Rename, ResolveIncludes, StripDimensions, TemplateVariables, VendorPrefix,
};
use crate::types::{AssetCategory, TaskName};

/// Tasks in registration order.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The eight front-end tasks, each chained after the previous one in
    /// build order.
    pub fn standard(env: &TaskEnv) -> Result<Self> {
        let config = &env.config;
        let mut registry = Self::new();

        registry.register(
            Task::new(TaskName::Sites, AssetCategory::Sites, env)
                .sources([AssetCategory::Sites])
                .watching([AssetCategory::Sites, AssetCategory::Templates])
                .transform(ResolveIncludes)
                .transform(TemplateVariables::new(config.template.data.clone()))
                .reload_on_write(true),
        )?;

        registry.register(
            Task::new(TaskName::Fonts, AssetCategory::Fonts, env)
                .sources([AssetCategory::Fonts])
                .reload_on_write(true),
        )?;

        let styles = &config.styles;
        registry.register(
            Task::new(TaskName::Styles, AssetCategory::Styles, env)
                .sources([AssetCategory::Styles])
                .startup_delay(styles.entry_delay())
                .transform(CompileStyles)
                .transform(VendorPrefix::from_queries(&styles.browsers, styles.minify)?)
                .transform(Rename::new(styles.output_name.clone()))
                .transform(EmitSourceMaps::new(styles.maps_dir.clone()))
                .reload_on_write(true),
        )?;

        registry.register(
            Task::new(TaskName::Scripts, AssetCategory::Scripts, env)
                .sources([AssetCategory::Scripts])
                .transform(ResolveIncludes)
                .transform(MinifyScript)
                .transform(Rename::new(config.scripts.output_name.clone()))
                .reload_on_write(true),
        )?;

        registry.register(
            Task::new(TaskName::Images, AssetCategory::Images, env)
                .sources([AssetCategory::Images])
                .transform(OptimizeImages::new(config.images.optimize))
                .reload_on_write(true),
        )?;

        let precision = config.svg.float_precision;
        registry.register(
            Task::new(TaskName::VectorGraphics, AssetCategory::VectorGraphics, env)
                .sources([AssetCategory::VectorGraphics])
                .transform(OptimizeSvg::new(precision))
                .transform(StripDimensions::new(false))
                .reload_on_write(true),
        )?;

        registry.register(
            Task::new(TaskName::VectorSprite, AssetCategory::VectorSprite, env)
                .sources([AssetCategory::VectorSprite])
                .transform(OptimizeSvg::new(precision))
                .transform(AssembleSprite)
                .transform(StripDimensions::new(true))
                .transform(Rename::new(config.sprite.output_name.clone()))
                .reload_on_write(true),
        )?;

        // Vendor files are loaded by pages that reload anyway.
        registry.register(
            Task::new(TaskName::Vendors, AssetCategory::VendorsA, env)
                .sources([AssetCategory::VendorsA, AssetCategory::VendorsB]),
        )?;

        registry.chain_in_build_order();
        Ok(registry)
    }

    fn chain_in_build_order(&mut self) {
        for task in self.tasks.iter_mut() {
            let Some(pos) = TaskName::BUILD_ORDER.iter().position(|n| *n == task.name()) else {
                continue;
            };
            if pos > 0 && task.dependencies().is_empty() {
                let previous = TaskName::BUILD_ORDER[pos - 1];
                task.add_dependency(previous);
            }
        }
    }

    /// Add a task. Each name may be registered once.
    pub fn register(&mut self, task: Task) -> Result<()> {
        if self.get(task.name()).is_some() {
            return Err(SitepipeError::ConfigError(format!(
                "task '{}' is registered twice",
                task.name()
            )));
        }
        self.tasks.push(task);
        Ok(())
    }

    pub fn get(&self, name: TaskName) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name() == name)
    }

    /// Like [`TaskRegistry::get`], but an unknown name is an error.
    pub fn require(&self, name: TaskName) -> Result<&Task> {
        self.get(name)
            .ok_or_else(|| SitepipeError::TaskNotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ConfigFile;
    use crate::fs::mock::MockFileSystem;

    fn env() -> TaskEnv {
        let config = Arc::new(ConfigFile::defaults().unwrap());
        TaskEnv::new(config, Arc::new(MockFileSystem::new()), ".")
    }

    #[test]
    fn standard_registry_follows_build_order() {
        let registry = TaskRegistry::standard(&env()).unwrap();
        let names: Vec<TaskName> = registry.iter().map(|t| t.name()).collect();
        assert_eq!(names, TaskName::BUILD_ORDER.to_vec());

        assert!(registry.require(TaskName::Sites).unwrap().dependencies().is_empty());
        assert_eq!(
            registry.require(TaskName::Styles).unwrap().dependencies(),
            &[TaskName::Fonts]
        );
        assert_eq!(
            registry.require(TaskName::Vendors).unwrap().dependencies(),
            &[TaskName::VectorSprite]
        );
    }

    #[test]
    fn pipelines_are_wired_per_category() {
        let registry = TaskRegistry::standard(&env()).unwrap();
        assert_eq!(
            registry.require(TaskName::Styles).unwrap().transform_names(),
            vec!["compile-styles", "vendor-prefix", "rename", "source-maps"]
        );
        assert_eq!(
            registry.require(TaskName::VectorSprite).unwrap().transform_names(),
            vec!["optimize-svg", "assemble-sprite", "strip-dimensions", "rename"]
        );
        assert!(registry.require(TaskName::Fonts).unwrap().transform_names().is_empty());

        let sites = registry.require(TaskName::Sites).unwrap();
        assert_eq!(
            sites.watch_categories(),
            &[AssetCategory::Sites, AssetCategory::Templates]
        );
        let vendors = registry.require(TaskName::Vendors).unwrap();
        assert_eq!(
            vendors.source_categories(),
            &[AssetCategory::VendorsA, AssetCategory::VendorsB]
        );
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let env = env();
        let mut registry = TaskRegistry::new();
        registry
            .register(Task::new(TaskName::Fonts, AssetCategory::Fonts, &env))
            .unwrap();
        let err = registry
            .register(Task::new(TaskName::Fonts, AssetCategory::Fonts, &env))
            .unwrap_err();
        assert!(matches!(err, SitepipeError::ConfigError(_)));
        assert!(matches!(
            registry.require(TaskName::Images),
            Err(SitepipeError::TaskNotFound(_))
        ));
    }
}
