// tests/watch_routing.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::project::TempProject;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use notify::event::{AccessKind, DataChange, ModifyKind};
use notify::{Event, EventKind};
use tokio::sync::mpsc;

use sitepipe::engine::RuntimeEvent;
use sitepipe::fs::RealFileSystem;
use sitepipe::tasks::TaskRegistry;
use sitepipe::types::TaskName;
use sitepipe::watch::{
    bindings_from_registry, process_event, HashFilter, MemoryHashStore, WatchContext,
};

type TestResult = Result<(), Box<dyn Error>>;

fn modified(path: PathBuf) -> Event {
    Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content))).add_path(path)
}

fn context(
    project: &TempProject,
    use_hash: bool,
) -> Result<(WatchContext, mpsc::Receiver<RuntimeEvent>), Box<dyn Error>> {
    let env = project.env(ConfigFileBuilder::new().build());
    let registry = TaskRegistry::standard(&env)?;
    let bindings = Arc::new(bindings_from_registry(&registry, env.config.paths()));

    let hash_filter = use_hash.then(|| {
        let filter = HashFilter::new(Arc::new(RealFileSystem), Box::new(MemoryHashStore::new()));
        filter.prime(&bindings, project.root());
        Arc::new(filter)
    });

    let (runtime_tx, runtime_rx) = mpsc::channel(16);
    let ctx = WatchContext {
        root: project.root().to_path_buf(),
        bindings,
        runtime_tx,
        hash_filter,
    };
    Ok((ctx, runtime_rx))
}

fn triggered(rx: &mut mpsc::Receiver<RuntimeEvent>) -> Vec<TaskName> {
    let mut tasks = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let RuntimeEvent::TaskTriggered { task, .. } = event {
            tasks.push(task);
        }
    }
    tasks
}

#[tokio::test]
async fn script_change_triggers_only_the_scripts_task() -> TestResult {
    init_tracing();
    let project = TempProject::new().with_sample_site();
    let (ctx, mut rx) = context(&project, false)?;

    assert!(with_timeout(process_event(&ctx, modified(project.path("src/assets/js/main.js")))).await);

    assert_eq!(triggered(&mut rx), vec![TaskName::Scripts]);
    Ok(())
}

#[tokio::test]
async fn template_change_rebuilds_pages() -> TestResult {
    init_tracing();
    let project = TempProject::new().with_sample_site();
    let (ctx, mut rx) = context(&project, false)?;

    with_timeout(process_event(&ctx, modified(project.path("src/templates/head.html")))).await;

    assert_eq!(triggered(&mut rx), vec![TaskName::Sites]);
    Ok(())
}

#[tokio::test]
async fn partial_change_rebuilds_styles() -> TestResult {
    init_tracing();
    let project = TempProject::new().with_sample_site();
    let (ctx, mut rx) = context(&project, false)?;

    with_timeout(process_event(
        &ctx,
        modified(project.path("src/assets/css/partials/_nav.scss")),
    ))
    .await;

    assert_eq!(triggered(&mut rx), vec![TaskName::Styles]);
    Ok(())
}

#[tokio::test]
async fn one_event_touching_several_categories_triggers_each_task_once() -> TestResult {
    init_tracing();
    let project = TempProject::new().with_sample_site();
    let (ctx, mut rx) = context(&project, false)?;

    let event = modified(project.path("src/assets/js/main.js"))
        .add_path(project.path("src/assets/fonts/body.woff2"))
        .add_path(project.path("src/assets/js/main.js"));
    with_timeout(process_event(&ctx, event)).await;

    let mut tasks = triggered(&mut rx);
    tasks.sort();
    assert_eq!(tasks, vec![TaskName::Fonts, TaskName::Scripts]);
    Ok(())
}

#[tokio::test]
async fn build_output_and_unrelated_files_trigger_nothing() -> TestResult {
    init_tracing();
    let project = TempProject::new().with_sample_site();
    project.write("dist/assets/js/common.min.js", "x");
    project.write("README.md", "docs");
    let (ctx, mut rx) = context(&project, false)?;

    with_timeout(process_event(&ctx, modified(project.path("dist/assets/js/common.min.js")))).await;
    with_timeout(process_event(&ctx, modified(project.path("README.md")))).await;

    assert!(triggered(&mut rx).is_empty());
    Ok(())
}

#[tokio::test]
async fn access_events_are_ignored() -> TestResult {
    init_tracing();
    let project = TempProject::new().with_sample_site();
    let (ctx, mut rx) = context(&project, false)?;

    let event = Event::new(EventKind::Access(AccessKind::Any))
        .add_path(project.path("src/assets/js/main.js"));
    with_timeout(process_event(&ctx, event)).await;

    assert!(triggered(&mut rx).is_empty());
    Ok(())
}

#[tokio::test]
async fn unchanged_content_is_suppressed_when_hashing() -> TestResult {
    init_tracing();
    let project = TempProject::new().with_sample_site();
    let (ctx, mut rx) = context(&project, true)?;
    let script = project.path("src/assets/js/main.js");

    // Saved without edits.
    with_timeout(process_event(&ctx, modified(script.clone()))).await;
    assert!(triggered(&mut rx).is_empty());

    project.write("src/assets/js/main.js", "console.log('edited');\n");
    with_timeout(process_event(&ctx, modified(script.clone()))).await;
    assert_eq!(triggered(&mut rx), vec![TaskName::Scripts]);

    // Same bytes again.
    with_timeout(process_event(&ctx, modified(script))).await;
    assert!(triggered(&mut rx).is_empty());
    Ok(())
}

#[tokio::test]
async fn closed_runtime_stops_event_processing() -> TestResult {
    init_tracing();
    let project = TempProject::new().with_sample_site();
    let (ctx, rx) = context(&project, false)?;
    drop(rx);

    let keep_going =
        with_timeout(process_event(&ctx, modified(project.path("src/assets/js/main.js")))).await;

    assert!(!keep_going);
    Ok(())
}
