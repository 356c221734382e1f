// src/tasks/mod.rs

//! Build tasks.
//!
//! - [`task`] defines a single [`Task`]: sources, transform pipeline and
//!   output directory, plus the typed [`TaskReport`] it returns.
//! - [`registry`] builds the eight standard front-end tasks.
//! - [`clean`] removes the build root.

pub mod clean;
pub mod registry;
pub mod task;

pub use clean::clean;
pub use registry::TaskRegistry;
pub use task::{FailureKind, Task, TaskEnv, TaskOutcome, TaskReport};
