// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module:
//! - derives one [`WatchBinding`] per task from the path table,
//! - wires up a cross-platform filesystem watcher (`notify`),
//! - optionally hashes watched content so saves that change nothing do
//!   not re-run a task.
//!
//! It knows nothing about task execution; it only turns filesystem changes
//! into `RuntimeEvent::TaskTriggered`.

pub mod bindings;
pub mod cache;
pub mod event_handler;
pub mod hash;
pub mod watcher;

pub use bindings::{bindings_from_registry, matching_tasks, WatchBinding};
pub use event_handler::{process_event, relative_to_root, HashFilter, WatchContext};
pub use hash::{FileHashStore, HashStore, MemoryHashStore, HASH_FILE_PATH};
pub use watcher::{spawn_watcher, WatcherHandle};
