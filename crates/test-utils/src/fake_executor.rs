use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use sitepipe::engine::RuntimeEvent;
use sitepipe::errors::Result;
use sitepipe::exec::ExecutorBackend;
use sitepipe::tasks::TaskOutcome;
use sitepipe::types::TaskName;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which tasks were "run"
/// - immediately reports TaskCompleted(Success) for each dispatched task.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<TaskName>>>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<TaskName>>>) -> Self {
        Self { runtime_tx, executed }
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<TaskName>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);

        Box::pin(async move {
            for task in tasks {
                executed.lock().unwrap().push(task);

                tx.send(RuntimeEvent::TaskCompleted {
                    task,
                    outcome: TaskOutcome::Success,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
