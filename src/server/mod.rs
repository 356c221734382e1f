// src/server/mod.rs

//! Development server: static files from the build output plus a
//! WebSocket live-reload endpoint.

pub mod http;
pub mod reload;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Result};
use tiny_http::Server;
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::paths::GlobPattern;

pub use http::StaticSite;
pub use reload::{ReloadHandle, ReloadHub, ReloadMessage};

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Bind `host:base_port`, moving to the next port while the current one is busy.
pub fn bind_with_retry(host: &str, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match Server::http(format!("{host}:{port}")) {
            Ok(server) => {
                let addr = server
                    .server_addr()
                    .to_ip()
                    .ok_or_else(|| anyhow!("server bound to a non-IP address"))?;
                if offset > 0 {
                    warn!(base_port, port, "port in use, using next free port");
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(anyhow!(
        "failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// A running static file server.
pub struct DevServer {
    server: Arc<Server>,
    addr: SocketAddr,
    worker: Option<JoinHandle<()>>,
}

impl DevServer {
    /// Bind and start serving `site` on a background thread.
    pub fn bind(host: &str, port: u16, site: StaticSite, log_prefix: &str) -> Result<Self> {
        let (server, addr) = bind_with_retry(host, port)?;
        let server = Arc::new(server);

        let worker = {
            let server = Arc::clone(&server);
            let prefix = log_prefix.to_string();
            thread::spawn(move || {
                for request in server.incoming_requests() {
                    let method = request.method().to_string();
                    let url = request.url().to_string();
                    if let Err(e) = site.handle(request) {
                        warn!(%prefix, %method, %url, error = %e, "request failed");
                    } else {
                        debug!(%prefix, %method, %url, "request served");
                    }
                }
            })
        };

        info!(prefix = %log_prefix, "serving http://{addr}/");
        Ok(Self {
            server,
            addr,
            worker: Some(worker),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting requests and wait for the worker to finish.
    pub fn shutdown(mut self) {
        self.server.unblock();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for DevServer {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

/// Handles of a fully started development server.
pub struct ServerHandles {
    pub http: DevServer,
    pub hub: ReloadHub,
    /// Give this to the tasks so their writes reach the browsers.
    pub reload: ReloadHandle,
}

/// Start the reload hub and the static server described by `[server]`.
///
/// `project_root` anchors `base_dir` and the build root.
pub fn start(config: &ConfigFile, project_root: &Path) -> Result<ServerHandles> {
    let server = &config.server;
    let files = GlobPattern::new(config.server_files())?;
    let (hub, reload) = ReloadHub::start(&server.host, server.reload_port, files)?;

    let base_dir = match &server.base_dir {
        Some(dir) => PathBuf::from(dir),
        None => config.paths().build_root().to_path_buf(),
    };
    let site = StaticSite {
        root: project_root.join(base_dir),
        directory_listing: server.directory,
        reload_port: Some(hub.port()),
    };
    let http = DevServer::bind(&server.host, server.port, site, &server.log_prefix)?;

    Ok(ServerHandles { http, hub, reload })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    fn get(addr: SocketAddr, method: &str, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(
            stream,
            "{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
        )
        .unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).unwrap();
        out
    }

    fn serve(dir: &Path) -> DevServer {
        let site = StaticSite {
            root: dir.to_path_buf(),
            directory_listing: true,
            reload_port: Some(35729),
        };
        DevServer::bind("127.0.0.1", 0, site, "test").unwrap()
    }

    #[test]
    fn serves_files_with_reload_script() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html><body>home</body></html>").unwrap();
        std::fs::write(dir.path().join("app.js"), "run()").unwrap();
        let server = serve(dir.path());

        let page = get(server.addr(), "GET", "/");
        assert!(page.starts_with("HTTP/1.1 200"));
        assert!(page.contains("home<script>"));

        let script = get(server.addr(), "GET", "/app.js");
        assert!(script.contains("application/javascript"));
        assert!(script.ends_with("run()"));

        server.shutdown();
    }

    #[test]
    fn missing_file_is_404_and_head_has_no_body() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.css"), "body{}").unwrap();
        let server = serve(dir.path());

        assert!(get(server.addr(), "GET", "/nope.css").starts_with("HTTP/1.1 404"));

        let head = get(server.addr(), "HEAD", "/a.css");
        assert!(head.starts_with("HTTP/1.1 200"));
        assert!(!head.contains("body{}"));

        server.shutdown();
    }
}
