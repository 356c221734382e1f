// src/watch/watcher.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::HashStorageMode;
use crate::watch::bindings::WatchBinding;
use crate::watch::event_handler::{process_event, HashFilter, WatchContext};
use crate::watch::hash::{FileHashStore, HashStore, MemoryHashStore};

/// Keeps the underlying `RecommendedWatcher` alive. Dropping it stops
/// file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `root` recursively and send `RuntimeEvent::TaskTriggered` for
/// every binding matched by a change.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    bindings: Vec<WatchBinding>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    hashing: Option<HashStorageMode>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);
    let bindings = Arc::new(bindings);

    let hash_filter = hashing.map(|storage| {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let store: Box<dyn HashStore> = match storage {
            HashStorageMode::File => Box::new(FileHashStore::new(&root, fs.clone())),
            HashStorageMode::Memory => Box::new(MemoryHashStore::new()),
        };
        let filter = Arc::new(HashFilter::new(fs, store));
        filter.prime(&bindings, &root);
        filter
    });

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event_tx.send(event).is_err() {
                    debug!("watch loop is gone, dropping notify event");
                }
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )?;
    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!("file watcher started on {:?}", root);

    let ctx = WatchContext {
        root,
        bindings,
        runtime_tx,
        hash_filter,
    };
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");
            if !process_event(&ctx, event).await {
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
