// tests/build_pipeline.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::project::TempProject;
use crate::common::{init_tracing, orchestrator as orchestrator_with};

use std::error::Error;

use sitepipe::engine::BuildOrchestrator;
use sitepipe::tasks::{FailureKind, TaskOutcome};
use sitepipe::types::TaskName;

type TestResult = Result<(), Box<dyn Error>>;

fn orchestrator(project: &TempProject) -> Result<BuildOrchestrator, Box<dyn Error>> {
    let config = ConfigFileBuilder::new()
        .with_template_value("title", "Landing")
        .build();
    Ok(orchestrator_with(project, config)?)
}

#[tokio::test]
async fn empty_source_tree_builds_successfully_without_output() -> TestResult {
    init_tracing();
    let project = TempProject::new();

    let summary = orchestrator(&project)?.build().await?;

    assert!(summary.is_success());
    assert_eq!(summary.tasks(), TaskName::BUILD_ORDER.to_vec());
    assert_eq!(summary.written_count(), 0);
    assert!(!project.exists("dist"));
    Ok(())
}

#[tokio::test]
async fn full_build_writes_every_category() -> TestResult {
    init_tracing();
    let project = TempProject::new().with_sample_site();

    let summary = orchestrator(&project)?.build().await?;
    assert!(summary.is_success(), "failures: {:?}", summary.failed().collect::<Vec<_>>());

    let page = project.read_string("dist/sites/index.html");
    assert!(page.contains("<meta charset=\"utf-8\">"));
    assert!(page.contains("<h1>Landing</h1>"));
    assert!(!page.contains("//="));

    let css = project.read_string("dist/assets/css/main.min.css");
    assert!(css.contains(".nav"));
    assert!(css.contains(".page"));
    assert!(css.contains("sourceMappingURL=maps/main.min.css.map"));
    assert!(project.exists("dist/assets/css/maps/main.min.css.map"));
    assert!(!project.exists("dist/assets/css/partials"));

    let js = project.read_string("dist/assets/js/common.min.js");
    assert!(js.contains("function start"), "{js}");
    assert!(js.contains("start(21)"), "{js}");
    assert!(!js.contains("doubled"));
    assert_eq!(
        project.read("dist/assets/img/photo.jpg"),
        project.read("src/assets/img/photo.jpg")
    );
    assert!(!project.exists("dist/assets/img/svg/sprite"));

    let logo = project.read_string("dist/assets/img/svg/logo.svg");
    assert!(logo.contains("viewBox"));
    assert!(!logo.contains("width="));

    let sprite = project.read_string("dist/assets/img/svg/sprite.svg");
    assert!(sprite.contains("<symbol"));
    assert!(sprite.contains("id=\"arrow\""));

    assert_eq!(
        project.read("dist/assets/fonts/body.woff2"),
        project.read("src/assets/fonts/body.woff2")
    );
    assert!(project.exists("dist/assets/vendors/jquery/jquery.js"));
    assert!(project.exists("dist/assets/vendors/plugin.css"));
    Ok(())
}

#[tokio::test]
async fn rebuild_without_source_changes_writes_nothing() -> TestResult {
    init_tracing();
    let project = TempProject::new().with_sample_site();
    let orchestrator = orchestrator(&project)?;

    let first = orchestrator.build().await?;
    assert!(first.written_count() > 0);
    let before = project.snapshot("dist");

    let second = orchestrator.build().await?;
    assert!(second.is_success());
    assert_eq!(second.written_count(), 0);
    assert_eq!(project.snapshot("dist"), before);
    Ok(())
}

#[tokio::test]
async fn broken_stylesheet_keeps_previous_output_and_build_continues() -> TestResult {
    init_tracing();
    let project = TempProject::new().with_sample_site();
    let orchestrator = orchestrator(&project)?;

    orchestrator.build().await?;
    let css_before = project.read("dist/assets/css/main.min.css");

    project.write("src/assets/css/main.scss", ".page { color: $missing; }\n");
    project.write("src/assets/js/main.js", "function other() { return 1; }\nother();\n");
    let js_before = project.read("dist/assets/js/common.min.js");

    let summary = orchestrator.build().await?;

    assert!(!summary.is_success());
    let failed: Vec<_> = summary.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].task, TaskName::Styles);
    assert!(matches!(
        failed[0].outcome,
        TaskOutcome::Failed { kind: FailureKind::Transform, .. }
    ));

    // Later tasks still ran.
    assert_eq!(summary.tasks(), TaskName::BUILD_ORDER.to_vec());
    assert_eq!(project.read("dist/assets/css/main.min.css"), css_before);
    let js = project.read_string("dist/assets/js/common.min.js");
    assert_ne!(js.as_bytes(), js_before.as_slice());
    assert!(js.contains("function other"), "{js}");
    assert!(!js.contains("function start"));
    Ok(())
}

#[tokio::test]
async fn single_task_run_only_touches_its_output() -> TestResult {
    init_tracing();
    let project = TempProject::new().with_sample_site();

    let report = orchestrator(&project)?.run_task(TaskName::Scripts).await?;

    assert_eq!(report.outcome, TaskOutcome::Success);
    assert_eq!(report.written.len(), 1);
    assert!(project.exists("dist/assets/js/common.min.js"));
    assert!(!project.exists("dist/sites"));
    assert!(!project.exists("dist/assets/css"));
    Ok(())
}

#[tokio::test]
async fn missing_template_value_fails_only_the_sites_task() -> TestResult {
    init_tracing();
    let project = TempProject::new().with_sample_site();
    let orchestrator = orchestrator_with(&project, ConfigFileBuilder::new().build())?;

    let summary = orchestrator.build().await?;

    let failed: Vec<TaskName> = summary.failed().map(|r| r.task).collect();
    assert_eq!(failed, vec![TaskName::Sites]);
    assert!(!project.exists("dist/sites/index.html"));
    assert!(project.exists("dist/assets/js/common.min.js"));
    Ok(())
}
