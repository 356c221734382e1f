// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod paths;
pub mod server;
pub mod tasks;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::cli::{CliArgs, Command};
use crate::config::{load_or_default, ConfigFile};
use crate::engine::{BuildOrchestrator, CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::exec::RealExecutorBackend;
use crate::fs::{FileSystem, RealFileSystem};
use crate::tasks::{TaskEnv, TaskRegistry};

/// High-level entry point used by `main.rs`. Returns the process exit code.
///
/// This wires together:
/// - config loading
/// - the task registry and build plan
/// - the watch runtime and executor
/// - the dev server and live reload
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<i32> {
    let config = Arc::new(load_or_default(args.config.as_deref())?);
    let project_root = project_root_dir(args.config.as_deref());
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    debug!(?project_root, command = %args.command, "resolved project");

    if args.dry_run {
        let env = TaskEnv::new(config.clone(), fs, project_root);
        let orchestrator = BuildOrchestrator::new(Arc::new(TaskRegistry::standard(&env)?))?;
        print_dry_run(&config, &orchestrator);
        return Ok(0);
    }

    match args.command {
        Command::Clean => {
            tasks::clean(&config, fs.as_ref(), &project_root)?;
            Ok(0)
        }
        Command::Build => {
            let env = TaskEnv::new(config, fs, project_root);
            let orchestrator = BuildOrchestrator::new(Arc::new(TaskRegistry::standard(&env)?))?;
            let summary = orchestrator.build().await?;
            Ok(if summary.is_success() { 0 } else { 1 })
        }
        Command::BuildTask(task) => {
            let env = TaskEnv::new(config, fs, project_root);
            let orchestrator = BuildOrchestrator::new(Arc::new(TaskRegistry::standard(&env)?))?;
            let report = orchestrator.run_task(task).await?;
            Ok(if report.outcome.is_success() { 0 } else { 1 })
        }
        Command::Watch => {
            let env = TaskEnv::new(config.clone(), fs, project_root.clone());
            let registry = Arc::new(TaskRegistry::standard(&env)?);
            watch_until_shutdown(&config, registry, &project_root).await?;
            Ok(0)
        }
        Command::Default | Command::RunServer => {
            serve(config, fs, project_root).await?;
            Ok(0)
        }
    }
}

/// Start the dev server, build once, then watch until Ctrl-C.
async fn serve(config: Arc<ConfigFile>, fs: Arc<dyn FileSystem>, project_root: PathBuf) -> Result<()> {
    // Tasks capture the reload handle at construction, so the hub comes up
    // before the initial build. Early requests may see a partial output tree.
    let handles = server::start(&config, &project_root)?;
    let env = TaskEnv::new(config.clone(), fs, project_root.clone()).with_reload(handles.reload.clone());
    let registry = Arc::new(TaskRegistry::standard(&env)?);

    let orchestrator = BuildOrchestrator::new(Arc::clone(&registry))?;
    let summary = orchestrator.build().await?;
    if !summary.is_success() {
        error!(
            failed = ?summary.failed().map(|r| r.task).collect::<Vec<_>>(),
            "initial build had failures, watching anyway"
        );
    }

    info!(
        http = %handles.http.addr(),
        reload_port = handles.hub.port(),
        "dev server ready"
    );
    watch_until_shutdown(&config, registry, &project_root).await?;

    handles.http.shutdown();
    Ok(())
}

/// Watch the sources and re-run the bound task on every change.
async fn watch_until_shutdown(config: &ConfigFile, registry: Arc<TaskRegistry>, project_root: &Path) -> Result<()> {
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let bindings = watch::bindings_from_registry(&registry, config.paths());
    let hashing = config.config.use_hash.then_some(config.config.hash_storage);
    let _watcher = watch::spawn_watcher(project_root, bindings, rt_tx.clone(), hashing)?;

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for Ctrl+C: {e}");
                return;
            }
            if let Err(e) = tx.send(RuntimeEvent::ShutdownRequested).await {
                debug!("runtime already stopped before shutdown request: {e}");
            }
        });
    }

    let core = CoreRuntime::new(
        registry.iter().map(|t| t.name()),
        config.config.triggered_while_running_behaviour,
        RuntimeOptions::default(),
    );
    let executor = RealExecutorBackend::new(registry, rt_tx);
    Runtime::new(core, rt_rx, executor).run().await?;
    Ok(())
}

/// Paths in the config are relative to the directory holding it; without a
/// config file that is the current working directory.
fn project_root_dir(config_path: Option<&Path>) -> PathBuf {
    match config_path.and_then(Path::parent) {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Print the path table and the build plan.
fn print_dry_run(config: &ConfigFile, orchestrator: &BuildOrchestrator) {
    let paths = config.paths();
    println!("sitepipe dry-run");
    println!("  source_root = {}", paths.source_root().display());
    println!("  build_root = {}", paths.build_root().display());
    println!(
        "  config.triggered_while_running_behaviour = {:?}",
        config.config.triggered_while_running_behaviour
    );
    println!("  config.use_hash = {}", config.config.use_hash);
    println!();

    println!("paths:");
    for (category, entry) in paths.iter() {
        println!("  - {category}");
        println!("      src: {:?}", entry.source.patterns().collect::<Vec<_>>());
        println!("      build: {}", entry.output.display());
        println!("      watch: {:?}", entry.watch.patterns().collect::<Vec<_>>());
    }
    println!();

    println!("plan ({} tasks):", orchestrator.plan().len());
    for (i, name) in orchestrator.plan().order().iter().enumerate() {
        let Some(task) = orchestrator.registry().get(*name) else {
            continue;
        };
        println!("  {}. {name}", i + 1);
        println!("      output: {}", task.output_dir().display());
        if !task.transform_names().is_empty() {
            println!("      pipeline: {}", task.transform_names().join(" -> "));
        }
        if !task.dependencies().is_empty() {
            println!("      after: {:?}", task.dependencies().iter().map(|t| t.as_str()).collect::<Vec<_>>());
        }
    }

    debug!("dry-run complete (no execution)");
}
