// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! [`CoreRuntime`] consumes [`RuntimeEvent`]s and returns the commands the
//! async shell (`engine::runtime::Runtime`) should carry out. It owns no
//! channels, no Tokio types and performs no IO, so every watch-mode rule
//! is unit tested here.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions, TriggerReason};
use crate::tasks::TaskOutcome;
use crate::types::{TaskName, TriggerWhileRunningBehaviour};

/// Command produced by the core, executed by the IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Start these tasks.
    DispatchTasks(Vec<TaskName>),
    /// Nothing is running or pending and the runtime was asked to exit
    /// when idle.
    RequestExit,
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    pub keep_running: bool,
}

impl CoreStep {
    fn keep_running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Per-task serialisation: a task never runs twice at the same time, but
/// different tasks run concurrently.
#[derive(Debug)]
pub struct CoreRuntime {
    known: BTreeSet<TaskName>,
    running: BTreeSet<TaskName>,
    queue: TriggerQueue,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(
        tasks: impl IntoIterator<Item = TaskName>,
        behaviour: TriggerWhileRunningBehaviour,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            known: tasks.into_iter().collect(),
            running: BTreeSet::new(),
            queue: TriggerQueue::new(behaviour),
            options,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_empty() && self.queue.is_empty()
    }

    pub fn is_running(&self, task: TaskName) -> bool {
        self.running.contains(&task)
    }

    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { task, reason } => self.handle_trigger(task, reason),
            RuntimeEvent::TaskCompleted { task, outcome } => self.handle_completion(task, outcome),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }

    fn handle_trigger(&mut self, task: TaskName, reason: TriggerReason) -> CoreStep {
        if !self.known.contains(&task) {
            warn!(%task, "trigger for unregistered task ignored");
            return CoreStep::keep_running(Vec::new());
        }

        if self.running.contains(&task) {
            self.queue.record_trigger(task);
            return CoreStep::keep_running(Vec::new());
        }

        debug!(%task, ?reason, "dispatching task");
        self.running.insert(task);
        CoreStep::keep_running(vec![CoreCommand::DispatchTasks(vec![task])])
    }

    fn handle_completion(&mut self, task: TaskName, outcome: TaskOutcome) -> CoreStep {
        if !self.running.remove(&task) {
            warn!(%task, "completion for a task that was not running");
        }
        debug!(%task, success = outcome.is_success(), "task completed");

        let mut commands = Vec::new();
        if self.queue.take(task) {
            debug!(%task, "starting queued rerun");
            self.running.insert(task);
            commands.push(CoreCommand::DispatchTasks(vec![task]));
        }

        if self.options.exit_when_idle && self.is_idle() {
            commands.push(CoreCommand::RequestExit);
            return CoreStep {
                commands,
                keep_running: false,
            };
        }
        CoreStep::keep_running(commands)
    }
}
