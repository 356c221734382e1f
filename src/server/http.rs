// src/server/http.rs

//! Static file serving for the dev server.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use percent_encoding::percent_decode_str;
use tiny_http::{Header, Method, Request, Response, StatusCode};
use tracing::debug;

pub mod types {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JAVASCRIPT: &str = "application/javascript; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const SVG: &str = "image/svg+xml";
    pub const OCTET: &str = "application/octet-stream";
}

/// Content type by file extension.
pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => types::HTML,
        "css" => types::CSS,
        "js" | "mjs" => types::JAVASCRIPT,
        "json" | "map" => types::JSON,
        "svg" => types::SVG,
        "txt" => types::PLAIN,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        _ => types::OCTET,
    }
}

/// Outcome of mapping a request URL onto the served directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    File(PathBuf),
    /// A directory without `index.html`; `String` is its URL path.
    Listing(PathBuf, String),
    NotFound,
    Forbidden,
}

/// Decode the URL path, dropping query and fragment.
fn decode_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default()
}

/// Map `url` to a file under `root`.
///
/// Any `..` segment is forbidden, as is anything that escapes `root`
/// through symlinks. Directories resolve to their `index.html`, else to a
/// listing when `listing` is on.
pub fn resolve(root: &Path, url: &str, listing: bool) -> Resolved {
    let decoded = decode_url(url);
    let clean = decoded.trim_matches('/');
    if clean.split(['/', '\\']).any(|seg| seg == "..") {
        return Resolved::Forbidden;
    }

    let local = root.join(clean);
    let (Ok(canonical), Ok(root_canonical)) = (local.canonicalize(), root.canonicalize()) else {
        return Resolved::NotFound;
    };
    if !canonical.starts_with(&root_canonical) {
        return Resolved::Forbidden;
    }

    if canonical.is_file() {
        return Resolved::File(canonical);
    }
    if canonical.is_dir() {
        let index = canonical.join("index.html");
        if index.is_file() {
            return Resolved::File(index);
        }
        if listing {
            return Resolved::Listing(canonical, format!("/{clean}"));
        }
    }
    Resolved::NotFound
}

/// Insert the live-reload client before the last `</body>`, or append it.
pub fn inject_reload_script(body: &[u8], reload_port: u16) -> Vec<u8> {
    let script = format!(
        "<script>(function(){{var ws=new WebSocket('ws://'+location.hostname+':{reload_port}/');\
ws.onmessage=function(e){{try{{if(JSON.parse(e.data).type==='reload')location.reload();}}catch(_){{}}}};}})();</script>"
    );

    const PATTERN: &[u8] = b"</body>";
    let mut out = Vec::with_capacity(body.len() + script.len());
    match body
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
    {
        Some(pos) => {
            out.extend_from_slice(&body[..pos]);
            out.extend_from_slice(script.as_bytes());
            out.extend_from_slice(&body[pos..]);
        }
        None => {
            out.extend_from_slice(body);
            out.extend_from_slice(script.as_bytes());
        }
    }
    out
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// HTML directory listing, directories first, then files, by name.
pub fn render_listing(dir: &Path, url_path: &str) -> Result<String> {
    let mut entries: Vec<(bool, String)> = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {:?}", dir))? {
        let entry = entry?;
        let is_dir = entry.file_type()?.is_dir();
        entries.push((!is_dir, entry.file_name().to_string_lossy().into_owned()));
    }
    entries.sort();

    let base = url_path.trim_end_matches('/');
    let title = escape(if url_path.is_empty() { "/" } else { url_path });
    let mut html = format!("<!DOCTYPE html><html><head><title>{title}</title></head><body><h1>{title}</h1><ul>");
    if !base.is_empty() {
        html.push_str("<li><a href=\"../\">../</a></li>");
    }
    for (is_file, name) in entries {
        let slash = if is_file { "" } else { "/" };
        html.push_str(&format!(
            "<li><a href=\"{base}/{href}{slash}\">{label}{slash}</a></li>",
            href = escape(&name),
            label = escape(&name),
        ));
    }
    html.push_str("</ul></body></html>");
    Ok(html)
}

/// Request handler bound to one served directory.
#[derive(Debug, Clone)]
pub struct StaticSite {
    pub root: PathBuf,
    pub directory_listing: bool,
    pub reload_port: Option<u16>,
}

impl StaticSite {
    pub fn handle(&self, request: Request) -> Result<()> {
        if !matches!(request.method(), Method::Get | Method::Head) {
            return send(request, 405, types::PLAIN, b"405 Method Not Allowed".to_vec());
        }

        let url = request.url().to_string();
        match resolve(&self.root, &url, self.directory_listing) {
            Resolved::File(path) => {
                let content_type = mime_for(&path);
                let body = fs::read(&path).with_context(|| format!("reading {:?}", path))?;
                let body = self.maybe_inject(body, content_type);
                debug!(%url, ?path, "serving file");
                send(request, 200, content_type, body)
            }
            Resolved::Listing(dir, url_path) => {
                let body = render_listing(&dir, &url_path)?.into_bytes();
                let body = self.maybe_inject(body, types::HTML);
                send(request, 200, types::HTML, body)
            }
            Resolved::Forbidden => send(request, 403, types::PLAIN, b"403 Forbidden".to_vec()),
            Resolved::NotFound => send(request, 404, types::PLAIN, b"404 Not Found".to_vec()),
        }
    }

    fn maybe_inject(&self, body: Vec<u8>, content_type: &str) -> Vec<u8> {
        match (content_type.starts_with("text/html"), self.reload_port) {
            (true, Some(port)) => inject_reload_script(&body, port),
            _ => body,
        }
    }
}

fn send(request: Request, status: u16, content_type: &'static str, body: Vec<u8>) -> Result<()> {
    if request.method() == &Method::Head {
        let response = Response::empty(StatusCode(status))
            .with_header(make_header("Content-Type", content_type))
            .with_header(make_header("Cache-Control", "no-cache"));
        request.respond(response)?;
        return Ok(());
    }

    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type))
        .with_header(make_header("Cache-Control", "no-cache"));
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    Header::from_bytes(key, value).expect("static header is valid ASCII")
}
