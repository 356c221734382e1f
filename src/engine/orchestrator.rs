// src/engine/orchestrator.rs

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::dag::BuildPlan;
use crate::errors::Result;
use crate::exec::run_blocking;
use crate::tasks::{TaskRegistry, TaskReport};
use crate::types::TaskName;

/// Reports of one full build, in run order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub reports: Vec<TaskReport>,
}

impl BuildSummary {
    pub fn is_success(&self) -> bool {
        self.reports.iter().all(|r| r.outcome.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &TaskReport> {
        self.reports.iter().filter(|r| !r.outcome.is_success())
    }

    pub fn tasks(&self) -> Vec<TaskName> {
        self.reports.iter().map(|r| r.task).collect()
    }

    pub fn written_count(&self) -> usize {
        self.reports.iter().map(|r| r.written.len()).sum()
    }
}

/// Runs the build plan one task at a time.
#[derive(Debug, Clone)]
pub struct BuildOrchestrator {
    registry: Arc<TaskRegistry>,
    plan: BuildPlan,
}

impl BuildOrchestrator {
    pub fn new(registry: Arc<TaskRegistry>) -> Result<Self> {
        let plan = BuildPlan::from_registry(&registry)?;
        Ok(Self { registry, plan })
    }

    pub fn plan(&self) -> &BuildPlan {
        &self.plan
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Run every task in plan order. A failed task is reported and the
    /// build carries on with the next one.
    pub async fn build(&self) -> Result<BuildSummary> {
        let started = Instant::now();
        let mut summary = BuildSummary::default();

        for task in self.plan.order() {
            let report = self.run_task(*task).await?;
            summary.reports.push(report);
        }

        let failed = summary.failed().count();
        if failed == 0 {
            info!(
                tasks = summary.reports.len(),
                written = summary.written_count(),
                elapsed = ?started.elapsed(),
                "build finished"
            );
        } else {
            warn!(
                tasks = summary.reports.len(),
                failed,
                elapsed = ?started.elapsed(),
                "build finished with failures"
            );
        }
        Ok(summary)
    }

    /// Run a single task to completion.
    pub async fn run_task(&self, task: TaskName) -> Result<TaskReport> {
        info!(%task, "starting task");
        run_blocking(Arc::clone(&self.registry), task).await
    }
}
