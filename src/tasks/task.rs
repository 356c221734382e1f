// src/tasks/task.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::config::ConfigFile;
use crate::fs::FileSystem;
use crate::paths::{collect_sources, SourceFile};
use crate::server::ReloadHandle;
use crate::transform::{AssetFile, Transform, TransformContext, TransformError};
use crate::types::{AssetCategory, TaskName};

/// Everything a task needs from the outside world, passed in explicitly.
#[derive(Debug, Clone)]
pub struct TaskEnv {
    pub config: Arc<ConfigFile>,
    pub fs: Arc<dyn FileSystem>,
    /// Project root; every path in the path table is relative to it.
    pub root: PathBuf,
    pub reload: ReloadHandle,
}

impl TaskEnv {
    pub fn new(config: Arc<ConfigFile>, fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            fs,
            root: root.into(),
            reload: ReloadHandle::disabled(),
        }
    }

    pub fn with_reload(mut self, reload: ReloadHandle) -> Self {
        self.reload = reload;
        self
    }
}

/// Why a task run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A transform rejected its input.
    Transform,
    /// Reading sources or writing output failed.
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed { kind: FailureKind, message: String },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// Result of one task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub task: TaskName,
    pub outcome: TaskOutcome,
    /// Output files whose bytes changed, relative to the project root.
    pub written: Vec<PathBuf>,
}

impl TaskReport {
    fn failed(task: TaskName, kind: FailureKind, message: String) -> Self {
        Self {
            task,
            outcome: TaskOutcome::Failed { kind, message },
            written: Vec::new(),
        }
    }
}

/// One build task: read the sources of its categories, push them through
/// its transforms in order and write the result to its output directory.
pub struct Task {
    name: TaskName,
    env: TaskEnv,
    sources: Vec<AssetCategory>,
    watching: Vec<AssetCategory>,
    transforms: Vec<Box<dyn Transform>>,
    output: AssetCategory,
    startup_delay: Duration,
    reload_on_write: bool,
    after: Vec<TaskName>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("sources", &self.sources)
            .field("watching", &self.watching)
            .field("transforms", &self.transform_names())
            .field("output", &self.output)
            .field("after", &self.after)
            .finish_non_exhaustive()
    }
}

impl Task {
    /// A task with no sources and no transforms that writes to the output
    /// directory of `output`.
    pub fn new(name: TaskName, output: AssetCategory, env: &TaskEnv) -> Self {
        Self {
            name,
            env: env.clone(),
            sources: Vec::new(),
            watching: Vec::new(),
            transforms: Vec::new(),
            output,
            startup_delay: Duration::ZERO,
            reload_on_write: false,
            after: Vec::new(),
        }
    }

    /// Read the files selected by the source globs of `categories`. Unless
    /// [`Task::watching`] is set, the same categories are watched.
    pub fn sources(mut self, categories: impl IntoIterator<Item = AssetCategory>) -> Self {
        self.sources = categories.into_iter().collect();
        self
    }

    pub fn watching(mut self, categories: impl IntoIterator<Item = AssetCategory>) -> Self {
        self.watching = categories.into_iter().collect();
        self
    }

    pub fn transform(mut self, transform: impl Transform + 'static) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    pub fn startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    pub fn reload_on_write(mut self, reload: bool) -> Self {
        self.reload_on_write = reload;
        self
    }

    pub fn after(mut self, tasks: impl IntoIterator<Item = TaskName>) -> Self {
        self.after = tasks.into_iter().collect();
        self
    }

    pub fn add_dependency(&mut self, task: TaskName) {
        if !self.after.contains(&task) {
            self.after.push(task);
        }
    }

    pub fn name(&self) -> TaskName {
        self.name
    }

    pub fn dependencies(&self) -> &[TaskName] {
        &self.after
    }

    pub fn source_categories(&self) -> &[AssetCategory] {
        &self.sources
    }

    pub fn watch_categories(&self) -> &[AssetCategory] {
        if self.watching.is_empty() {
            &self.sources
        } else {
            &self.watching
        }
    }

    pub fn output_dir(&self) -> &Path {
        self.env.config.paths().output_dir(self.output)
    }

    pub fn transform_names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Run the task once. Failures are logged here and returned in the
    /// report; they never panic or abort the caller.
    pub fn run(&self) -> TaskReport {
        if !self.startup_delay.is_zero() {
            debug!(task = %self.name, delay = ?self.startup_delay, "delaying task start");
            std::thread::sleep(self.startup_delay);
        }

        let started = Instant::now();
        let report = match self.run_pipeline() {
            Ok(written) => TaskReport {
                task: self.name,
                outcome: TaskOutcome::Success,
                written,
            },
            Err(report) => report,
        };

        match &report.outcome {
            TaskOutcome::Success => info!(
                task = %self.name,
                written = report.written.len(),
                elapsed = ?started.elapsed(),
                "task finished"
            ),
            TaskOutcome::Failed { kind, message } => {
                error!(task = %self.name, ?kind, "{message}")
            }
        }
        report
    }

    fn run_pipeline(&self) -> Result<Vec<PathBuf>, TaskReport> {
        let fs = self.env.fs.as_ref();
        let io_failure = |e: anyhow::Error| TaskReport::failed(self.name, FailureKind::Io, format!("{e:#}"));

        let sources = self.collect().map_err(io_failure)?;
        if sources.is_empty() {
            debug!(task = %self.name, "no source files matched");
            return Ok(Vec::new());
        }

        let mut files = Vec::with_capacity(sources.len());
        for source in sources {
            let contents = fs.read(&source.path).map_err(io_failure)?;
            files.push(AssetFile::new(source.path, source.relative_to_base, contents));
        }

        let ctx = TransformContext { fs };
        for transform in &self.transforms {
            debug!(task = %self.name, stage = transform.name(), files = files.len(), "applying transform");
            files = transform.apply(files, &ctx).map_err(|e| {
                let kind = match e {
                    TransformError::Rejected { .. } => FailureKind::Transform,
                    TransformError::Io { .. } => FailureKind::Io,
                };
                TaskReport::failed(self.name, kind, format!("{e:#}"))
            })?;
        }

        let written = self.write_changed(&files).map_err(io_failure)?;
        if self.reload_on_write && !written.is_empty() {
            self.env.reload.notify(self.name, &written);
        }
        Ok(written)
    }

    /// Union of the source globs of every source category, sorted by path.
    fn collect(&self) -> anyhow::Result<Vec<SourceFile>> {
        let paths = self.env.config.paths();
        let mut found: BTreeMap<String, SourceFile> = BTreeMap::new();
        for category in &self.sources {
            let pattern = paths.source_globs(*category);
            for file in collect_sources(self.env.fs.as_ref(), &self.env.root, pattern)? {
                found.entry(file.rel.clone()).or_insert(file);
            }
        }
        Ok(found.into_values().collect())
    }

    /// Write every file whose bytes differ from what is on disk. Returns
    /// the written paths relative to the project root.
    fn write_changed(&self, files: &[AssetFile]) -> anyhow::Result<Vec<PathBuf>> {
        let fs = self.env.fs.as_ref();
        let out_dir = self.output_dir();
        let mut written = Vec::new();

        for file in files {
            let rel = out_dir.join(&file.relative);
            let target = self.env.root.join(&rel);
            if fs.is_file(&target) && fs.read(&target)? == file.contents {
                debug!(task = %self.name, path = ?rel, "output unchanged");
                continue;
            }
            fs.write(&target, &file.contents)?;
            written.push(rel);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::paths::GlobPattern;
    use crate::transform::{MinifyScript, Rename, ResolveIncludes};

    fn env(fs: &Arc<MockFileSystem>) -> TaskEnv {
        let config = Arc::new(ConfigFile::defaults().unwrap());
        TaskEnv::new(config, fs.clone(), ".")
    }

    fn scripts_task(env: &TaskEnv) -> Task {
        Task::new(TaskName::Scripts, AssetCategory::Scripts, env)
            .sources([AssetCategory::Scripts])
            .transform(ResolveIncludes)
            .transform(MinifyScript)
            .transform(Rename::new("common.min.js"))
            .reload_on_write(true)
    }

    #[test]
    fn no_sources_is_success_without_writes() {
        let fs = Arc::new(MockFileSystem::new());
        let report = scripts_task(&env(&fs)).run();
        assert_eq!(report.outcome, TaskOutcome::Success);
        assert!(report.written.is_empty());
        assert_eq!(fs.file_count(), 0);
    }

    #[test]
    fn writes_output_and_skips_identical_rerun() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("src/assets/js/main.js", "var answer = 40 + 2;\nconsole.log(answer);\n");
        let task = scripts_task(&env(&fs));

        let first = task.run();
        assert!(first.outcome.is_success());
        assert_eq!(first.written, vec![PathBuf::from("dist/assets/js/common.min.js")]);
        let built = fs.snapshot();

        let second = task.run();
        assert!(second.outcome.is_success());
        assert!(second.written.is_empty());
        assert_eq!(fs.snapshot(), built);
    }

    #[test]
    fn transform_failure_keeps_previous_output() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("src/assets/js/main.js", "//= missing.js\n");
        fs.add_file("dist/assets/js/common.min.js", "old");
        let report = scripts_task(&env(&fs)).run();

        assert!(matches!(
            report.outcome,
            TaskOutcome::Failed { kind: FailureKind::Transform, .. }
        ));
        assert!(report.written.is_empty());
        assert_eq!(
            fs.read(Path::new("./dist/assets/js/common.min.js")).unwrap(),
            b"old".to_vec()
        );
    }

    #[test]
    fn reload_is_pushed_only_for_written_files() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("src/assets/js/main.js", "let a = 1;\n");
        let (reload, rx) = ReloadHandle::channel(GlobPattern::new(["dist/**/*"]).unwrap());
        let task_env = env(&fs).with_reload(reload);
        let task = scripts_task(&task_env);

        task.run();
        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.task, "scripts");
        assert_eq!(msg.paths, vec!["dist/assets/js/common.min.js".to_string()]);

        task.run();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn watch_categories_default_to_sources() {
        let fs = Arc::new(MockFileSystem::new());
        let env = env(&fs);
        let task = Task::new(TaskName::Sites, AssetCategory::Sites, &env)
            .sources([AssetCategory::Sites]);
        assert_eq!(task.watch_categories(), &[AssetCategory::Sites]);

        let task = task.watching([AssetCategory::Sites, AssetCategory::Templates]);
        assert_eq!(task.watch_categories(), &[AssetCategory::Sites, AssetCategory::Templates]);
    }
}
