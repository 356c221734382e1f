// src/exec/task_runner.rs

//! Runs one task on the blocking thread pool.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::engine::RuntimeEvent;
use crate::errors::{Result, SitepipeError};
use crate::tasks::{FailureKind, TaskOutcome, TaskRegistry, TaskReport};
use crate::types::TaskName;

/// Run `task` from `registry` without blocking the async runtime.
///
/// Transforms and file IO are synchronous, so the run happens on
/// `spawn_blocking`.
pub async fn run_blocking(registry: Arc<TaskRegistry>, task: TaskName) -> Result<TaskReport> {
    registry.require(task)?;
    tokio::task::spawn_blocking(move || registry.require(task).map(|t| t.run()))
        .await
        .map_err(|e| SitepipeError::Other(anyhow::anyhow!("task '{}' panicked: {}", task, e)))?
}

/// Run `task` and report its outcome to the runtime.
///
/// A task that cannot be run at all (unknown, panicked) is reported as an
/// IO failure so the runtime never waits forever for it.
pub async fn run_and_report(
    registry: Arc<TaskRegistry>,
    task: TaskName,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let outcome = match run_blocking(registry, task).await {
        Ok(report) => report.outcome,
        Err(err) => {
            error!(%task, error = %err, "task execution error");
            TaskOutcome::Failed {
                kind: FailureKind::Io,
                message: err.to_string(),
            }
        }
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted { task, outcome })
        .await
        .is_err()
    {
        debug!(%task, "runtime is gone, completion dropped");
    }
}
