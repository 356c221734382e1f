// src/server/reload.rs

//! Live-reload push channel.
//!
//! Tasks hold a [`ReloadHandle`] and call [`ReloadHandle::notify`] after
//! writing output. The handle filters the written paths through the
//! `server.files` globs and forwards a [`ReloadMessage`] to the
//! [`ReloadHub`], which broadcasts it to every connected WebSocket client.

use std::fmt;
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message;
use tungstenite::WebSocket;

use crate::paths::GlobPattern;
use crate::types::TaskName;

/// Maximum port retry attempts.
const MAX_PORT_RETRIES: u16 = 10;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// JSON payload pushed to browsers: `{"type":"reload","task":..,"paths":[..]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub task: String,
    pub paths: Vec<String>,
}

impl ReloadMessage {
    pub fn reload(task: TaskName, paths: Vec<String>) -> Self {
        Self {
            kind: "reload",
            task: task.to_string(),
            paths,
        }
    }

    pub fn to_json(&self) -> String {
        // Serialising a struct of strings cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

struct HandleInner {
    files: GlobPattern,
    tx: Sender<ReloadMessage>,
}

/// Cheap, cloneable, fire-and-forget reload trigger.
///
/// A disabled handle (`ReloadHandle::disabled()`, also the `Default`)
/// ignores every call; `build`, `watch` without a server and most tests
/// use one.
#[derive(Clone, Default)]
pub struct ReloadHandle {
    inner: Option<Arc<HandleInner>>,
}

impl fmt::Debug for ReloadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(inner) => f
                .debug_struct("ReloadHandle")
                .field("files", &inner.files)
                .finish(),
            None => f.write_str("ReloadHandle(disabled)"),
        }
    }
}

impl ReloadHandle {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// A handle whose messages arrive on the returned receiver.
    pub fn channel(files: GlobPattern) -> (Self, Receiver<ReloadMessage>) {
        let (tx, rx) = mpsc::channel();
        let handle = Self {
            inner: Some(Arc::new(HandleInner { files, tx })),
        };
        (handle, rx)
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Push a reload for `task` if any of `written` (paths relative to the
    /// project root) matches the configured output globs.
    pub fn notify(&self, task: TaskName, written: &[PathBuf]) {
        let Some(inner) = &self.inner else {
            return;
        };

        let paths: Vec<String> = written
            .iter()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .filter(|p| inner.files.matches(p))
            .collect();
        if paths.is_empty() {
            debug!(%task, "no watched output changed, no reload");
            return;
        }

        if inner.tx.send(ReloadMessage::reload(task, paths)).is_err() {
            debug!(%task, "reload hub is gone, dropping reload");
        }
    }
}

/// WebSocket endpoint that browsers connect to for live reload.
pub struct ReloadHub {
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
    port: u16,
}

impl ReloadHub {
    /// Bind the WebSocket listener (retrying on the next ports if busy) and
    /// start the accept and broadcast threads.
    pub fn start(host: &str, base_port: u16, files: GlobPattern) -> Result<(Self, ReloadHandle)> {
        let (listener, port) = try_bind_port(host, base_port, MAX_PORT_RETRIES)?;
        let clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>> = Arc::new(Mutex::new(Vec::new()));

        {
            let clients = Arc::clone(&clients);
            thread::spawn(move || accept_loop(listener, clients));
        }

        let (handle, rx) = ReloadHandle::channel(files);
        {
            let clients = Arc::clone(&clients);
            thread::spawn(move || {
                for msg in rx {
                    broadcast(&clients, &msg);
                }
            });
        }

        info!(port, "live reload listening");
        Ok((Self { clients, port }, handle))
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }
}

fn accept_loop(listener: TcpListener, clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>) {
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "reload accept error");
                continue;
            }
        };
        let clients = Arc::clone(&clients);
        thread::spawn(move || handshake(stream, &clients));
    }
}

/// Upgrade one connection and register it. Runs on its own thread so a
/// client that stalls mid-handshake cannot block other connections.
fn handshake(stream: TcpStream, clients: &Mutex<Vec<WebSocket<TcpStream>>>) {
    if let Err(e) = stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT)) {
        debug!(error = %e, "cannot set handshake timeout");
    }
    match tungstenite::accept(stream) {
        Ok(ws) => {
            if let Err(e) = ws.get_ref().set_read_timeout(None) {
                debug!(error = %e, "cannot clear handshake timeout");
            }
            let mut clients = clients.lock();
            clients.push(ws);
            debug!(total = clients.len(), "reload client connected");
        }
        Err(e) => warn!(error = %e, "reload handshake failed"),
    }
}

/// Send `msg` to every client, dropping the ones that went away.
fn broadcast(clients: &Mutex<Vec<WebSocket<TcpStream>>>, msg: &ReloadMessage) {
    let json = msg.to_json();
    let mut clients = clients.lock();
    let before = clients.len();
    clients.retain_mut(|ws| ws.send(Message::Text(json.clone().into())).is_ok());
    debug!(
        task = %msg.task,
        delivered = clients.len(),
        dropped = before - clients.len(),
        "reload pushed"
    );
}

/// Try binding to port, retry with incremented port if in use.
fn try_bind_port(host: &str, base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind((host, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "failed to bind live reload server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist_files() -> GlobPattern {
        GlobPattern::new(["dist/**/*"]).unwrap()
    }

    #[test]
    fn notify_forwards_matching_paths_only() {
        let (handle, rx) = ReloadHandle::channel(dist_files());
        handle.notify(
            TaskName::Styles,
            &[PathBuf::from("dist/assets/css/main.min.css"), PathBuf::from("tmp/other")],
        );

        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.task, "styles");
        assert_eq!(msg.paths, vec!["dist/assets/css/main.min.css".to_string()]);
        assert_eq!(
            msg.to_json(),
            r#"{"type":"reload","task":"styles","paths":["dist/assets/css/main.min.css"]}"#
        );
    }

    #[test]
    fn notify_without_matches_sends_nothing() {
        let (handle, rx) = ReloadHandle::channel(dist_files());
        handle.notify(TaskName::Fonts, &[PathBuf::from("elsewhere/a.woff")]);
        handle.notify(TaskName::Fonts, &[]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn disabled_handle_is_a_no_op() {
        let handle = ReloadHandle::disabled();
        assert!(!handle.is_enabled());
        handle.notify(TaskName::Sites, &[PathBuf::from("dist/sites/index.html")]);
    }

    #[test]
    fn hub_broadcasts_to_connected_clients() {
        let (hub, handle) = ReloadHub::start("127.0.0.1", 0, dist_files()).unwrap();
        let url = format!("ws://127.0.0.1:{}/", hub.port());
        let (mut client, _) = tungstenite::connect(url).unwrap();

        for _ in 0..100 {
            if hub.client_count() == 1 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(hub.client_count(), 1);

        handle.notify(TaskName::Scripts, &[PathBuf::from("dist/assets/js/common.min.js")]);
        let msg = client.read().unwrap();
        assert!(msg.to_text().unwrap().contains(r#""task":"scripts""#));
    }

    #[test]
    fn stalled_handshake_does_not_block_other_clients() {
        let (hub, _handle) = ReloadHub::start("127.0.0.1", 0, dist_files()).unwrap();
        let _silent = TcpStream::connect(("127.0.0.1", hub.port())).unwrap();

        let url = format!("ws://127.0.0.1:{}/", hub.port());
        let (_client, _) = tungstenite::connect(url).unwrap();

        for _ in 0..100 {
            if hub.client_count() == 1 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(hub.client_count(), 1);
    }
}
