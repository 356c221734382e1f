// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`task_runner`] runs a task on the blocking pool and reports back to
//!   the runtime via `RuntimeEvent::TaskCompleted`.
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `RealExecutorBackend` used in production; tests replace it with a fake.

pub mod backend;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use task_runner::{run_and_report, run_blocking};
