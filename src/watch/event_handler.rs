// src/watch/event_handler.rs

//! Turns filesystem events into task triggers.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use notify::{Event, EventKind};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::fs::FileSystem;
use crate::paths::relative_str;
use crate::watch::bindings::{matching_tasks, WatchBinding};
use crate::watch::cache::FileCache;
use crate::watch::hash::{compute_aggregate_hash, HashStore};

/// Everything the event loop needs to route one event.
#[derive(Clone)]
pub struct WatchContext {
    pub root: PathBuf,
    pub bindings: Arc<Vec<WatchBinding>>,
    pub runtime_tx: mpsc::Sender<RuntimeEvent>,
    /// Present when `use_hash` is on.
    pub hash_filter: Option<Arc<HashFilter>>,
}

/// Suppresses triggers whose watched content did not actually change.
pub struct HashFilter {
    fs: Arc<dyn FileSystem>,
    store: Mutex<Box<dyn HashStore>>,
    cache: Mutex<FileCache>,
}

impl HashFilter {
    pub fn new(fs: Arc<dyn FileSystem>, store: Box<dyn HashStore>) -> Self {
        Self {
            fs,
            store: Mutex::new(store),
            cache: Mutex::new(FileCache::new()),
        }
    }

    /// Record the current content hash of every binding, so the first
    /// no-op save after startup is already suppressed.
    pub fn prime(&self, bindings: &[WatchBinding], root: &Path) {
        for binding in bindings {
            self.content_changed(binding, root, &[]);
        }
    }

    /// Whether the content watched by `binding` differs from the last
    /// recorded state. Any error counts as a change.
    pub fn content_changed(&self, binding: &WatchBinding, root: &Path, changed: &[PathBuf]) -> bool {
        let task = binding.task();
        let files = match binding.watched_files(self.fs.as_ref(), root) {
            Ok(files) => files,
            Err(err) => {
                warn!(%task, error = %err, "failed to collect watched files; triggering anyway");
                return true;
            }
        };

        let entries = {
            let Ok(mut cache) = self.cache.lock() else {
                warn!("file cache mutex poisoned; triggering anyway");
                return true;
            };
            for path in changed {
                cache.invalidate(path);
            }

            let mut entries = Vec::with_capacity(files.len());
            for file in files {
                match cache.get_or_compute(self.fs.as_ref(), &file) {
                    Ok(hash) => entries.push((file, hash)),
                    Err(err) => {
                        warn!(%task, file = ?file, error = %err, "failed to hash file; triggering anyway");
                        return true;
                    }
                }
            }
            entries
        };
        let new_hash = compute_aggregate_hash(&entries);

        let Ok(mut store) = self.store.lock() else {
            warn!(%task, "hash store mutex poisoned; triggering anyway");
            return true;
        };
        match store.load(task) {
            Ok(Some(old)) if old == new_hash => false,
            Ok(_) => {
                if let Err(err) = store.save(task, &new_hash) {
                    warn!(%task, error = %err, "failed to save task hash");
                }
                true
            }
            Err(err) => {
                warn!(%task, error = %err, "failed to load task hash; triggering anyway");
                true
            }
        }
    }
}

/// Path of `path` relative to `root`, with forward slashes.
///
/// Falls back to comparing canonical paths, since some platforms report
/// event paths through a different prefix (e.g. `/private/var` on macOS).
pub fn relative_to_root(root: &Path, path: &Path) -> Option<String> {
    if let Some(rel) = relative_str(root, path) {
        return Some(rel);
    }
    let (Ok(root), Ok(path)) = (root.canonicalize(), path.canonicalize()) else {
        return None;
    };
    relative_str(&root, &path)
}

/// Route one notify event: every bound task whose globs match one of the
/// event's paths is triggered once. Returns `false` once the runtime has
/// gone away.
pub async fn process_event(ctx: &WatchContext, event: Event) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return true;
    }

    let rels: Vec<String> = event
        .paths
        .iter()
        .filter_map(|p| {
            let rel = relative_to_root(&ctx.root, p);
            if rel.is_none() {
                warn!("could not relativize path {:?} against root {:?}", p, ctx.root);
            }
            rel
        })
        .collect();

    let tasks = matching_tasks(&ctx.bindings, rels.iter().map(String::as_str));
    if tasks.is_empty() {
        return true;
    }
    debug!(paths = ?rels, ?tasks, "watch match");

    for task in tasks {
        if let Some(filter) = &ctx.hash_filter {
            let Some(binding) = ctx.bindings.iter().find(|b| b.task() == task).cloned() else {
                continue;
            };
            let filter = Arc::clone(filter);
            let root = ctx.root.clone();
            let changed = event.paths.clone();
            let proceed = tokio::task::spawn_blocking(move || {
                filter.content_changed(&binding, &root, &changed)
            })
            .await
            .unwrap_or(true);
            if !proceed {
                info!(%task, "watched content unchanged; skipping trigger");
                continue;
            }
        }

        debug!(%task, "triggering task");
        let event = RuntimeEvent::TaskTriggered {
            task,
            reason: TriggerReason::FileWatch,
        };
        if let Err(err) = ctx.runtime_tx.send(event).await {
            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
            return false;
        }
    }
    true
}
