// tests/clean_build.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::project::TempProject;
use crate::common::{init_tracing, orchestrator};

use std::error::Error;

use sitepipe::fs::RealFileSystem;
use sitepipe::tasks::clean;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn clean_removes_build_root_and_keeps_sources() -> TestResult {
    init_tracing();
    let project = TempProject::new().with_sample_site();
    let config = ConfigFileBuilder::new().with_template_value("title", "x").build();

    orchestrator(&project, config.clone())?.build().await?;
    assert!(project.exists("dist/assets/js/common.min.js"));
    let sources = project.snapshot("src");

    let removed = clean(&config, &RealFileSystem, project.root())?;

    assert!(removed.is_some());
    assert!(!project.exists("dist"));
    assert_eq!(project.snapshot("src"), sources);
    Ok(())
}

#[test]
fn clean_without_build_root_is_a_no_op() -> TestResult {
    init_tracing();
    let project = TempProject::new().with_sample_site();
    let config = ConfigFileBuilder::new().build();

    assert_eq!(clean(&config, &RealFileSystem, project.root())?, None);
    assert!(project.exists("src/assets/js/main.js"));
    Ok(())
}

#[test]
fn clean_honours_custom_build_root() -> TestResult {
    init_tracing();
    let project = TempProject::new();
    project.write("public/index.html", "<html></html>");
    project.write("dist/keep.txt", "not ours");
    let config = ConfigFileBuilder::new().with_roots("src", "public").build();

    clean(&config, &RealFileSystem, project.root())?;

    assert!(!project.exists("public"));
    assert!(project.exists("dist/keep.txt"));
    Ok(())
}
