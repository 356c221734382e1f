// src/exec/backend.rs

//! Pluggable executor backend.
//!
//! The runtime talks to an `ExecutorBackend` instead of running tasks
//! itself, so tests can swap in a fake that records dispatches and emits
//! `TaskCompleted` events directly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::tasks::TaskRegistry;
use crate::types::TaskName;

use super::task_runner::run_and_report;

/// How dispatched tasks get executed.
pub trait ExecutorBackend: Send {
    /// Start the given tasks. Implementations must eventually send one
    /// `TaskCompleted` per task to the runtime.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<TaskName>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: each task runs on its own Tokio task, so different
/// tasks overlap. The core never dispatches a task that is still running.
pub struct RealExecutorBackend {
    registry: Arc<TaskRegistry>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl RealExecutorBackend {
    pub fn new(registry: Arc<TaskRegistry>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            registry,
            runtime_tx,
        }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<TaskName>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let registry = Arc::clone(&self.registry);
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            for task in tasks {
                tokio::spawn(run_and_report(Arc::clone(&registry), task, tx.clone()));
            }
            Ok(())
        })
    }
}
