// src/dag/mod.rs

//! Task ordering.
//!
//! [`plan`] validates the `after` relations between registered tasks and
//! turns them into a deterministic run order.

pub mod plan;

pub use plan::BuildPlan;
