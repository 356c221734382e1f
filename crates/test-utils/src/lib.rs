//! Shared fixtures for sitepipe's integration tests.

pub mod builders;
pub mod fake_executor;
pub mod project;

use std::future::Future;
use std::sync::{Arc, Once};
use std::time::Duration;

use sitepipe::config::ConfigFile;
use sitepipe::engine::BuildOrchestrator;
use sitepipe::tasks::TaskRegistry;
use tracing_subscriber::{fmt, EnvFilter};

use crate::project::TempProject;

static INIT: Once = Once::new();

/// Real transforms (Sass, minifier) run inside some tests, so the bound is
/// looser than a pure event-loop test would need.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Install a test-captured subscriber once per binary.
///
/// Defaults to `sitepipe=debug` so task and watcher decisions show up in
/// the output of a failing test; `RUST_LOG` overrides it.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,sitepipe=debug"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("test timed out after {TEST_TIMEOUT:?}"))
}

/// Standard task set for `project`, ready to build.
pub fn orchestrator(project: &TempProject, config: ConfigFile) -> anyhow::Result<BuildOrchestrator> {
    let registry = TaskRegistry::standard(&project.env(config))?;
    Ok(BuildOrchestrator::new(Arc::new(registry))?)
}
