// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::types::TaskName;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Drives the [`CoreRuntime`] from a channel of [`RuntimeEvent`]s and
/// hands dispatched tasks to an [`ExecutorBackend`].
///
/// All watch-mode semantics live in the core; this type only does the
/// async IO around it.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Main event loop. Returns when the channel closes, on shutdown, or
    /// when the core asks to exit.
    pub async fn run(mut self) -> Result<()> {
        info!("watch runtime started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("stopping watch runtime");
                return Ok(());
            }
        }

        info!("runtime event channel closed; exiting");
        Ok(())
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => self.spawn_ready(tasks).await,
            CoreCommand::RequestExit => {
                debug!("core is idle and requested exit");
                Ok(())
            }
        }
    }

    async fn spawn_ready(&mut self, tasks: Vec<TaskName>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        debug!(?tasks, "spawning ready tasks");
        self.executor.spawn_ready_tasks(tasks).await
    }
}
