// src/engine/mod.rs

//! Orchestration engine.
//!
//! - [`orchestrator`] runs the build plan once, strictly in order (`build`,
//!   `build:<task>`).
//! - [`core`] is the pure watch-mode state machine: which task to start
//!   when a trigger or completion arrives.
//! - [`queue`] holds reruns requested while a task was still running.
//! - [`runtime`] is the async shell that feeds events into the core and
//!   hands dispatched tasks to an executor backend.

use crate::tasks::TaskOutcome;
use crate::types::TaskName;

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// A watched source file changed.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Stop once nothing is running or queued.
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the watcher, the executor and the
/// Ctrl-C handler.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    ShutdownRequested,
}

pub mod core;
pub mod orchestrator;
pub mod queue;
pub mod runtime;

pub use core::{CoreCommand, CoreRuntime, CoreStep};
pub use orchestrator::{BuildOrchestrator, BuildSummary};
pub use queue::TriggerQueue;
pub use runtime::Runtime;
