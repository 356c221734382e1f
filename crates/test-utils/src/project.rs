use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sitepipe::config::ConfigFile;
use sitepipe::fs::RealFileSystem;
use sitepipe::tasks::TaskEnv;
use tempfile::TempDir;

/// A throwaway project directory on disk.
pub struct TempProject {
    dir: TempDir,
}

impl TempProject {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(path, contents).expect("write file");
    }

    pub fn read(&self, rel: &str) -> Vec<u8> {
        fs::read(self.path(rel)).expect("read file")
    }

    pub fn read_string(&self, rel: &str) -> String {
        String::from_utf8(self.read(rel)).expect("utf-8 file")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// Task environment over the real filesystem rooted at this project.
    pub fn env(&self, config: ConfigFile) -> TaskEnv {
        TaskEnv::new(Arc::new(config), Arc::new(RealFileSystem), self.dir.path())
    }

    /// Every file below `rel_dir` with its bytes, keyed by path relative
    /// to the project root.
    pub fn snapshot(&self, rel_dir: &str) -> BTreeMap<PathBuf, Vec<u8>> {
        let mut out = BTreeMap::new();
        let start = self.path(rel_dir);
        if !start.is_dir() {
            return out;
        }
        let mut stack = vec![start];
        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(&dir).expect("read dir") {
                let path = entry.expect("dir entry").path();
                if path.is_dir() {
                    stack.push(path);
                    continue;
                }
                let rel = path
                    .strip_prefix(self.dir.path())
                    .expect("path below project")
                    .to_path_buf();
                out.insert(rel, fs::read(&path).expect("read file"));
            }
        }
        out
    }

    /// A small front-end source tree touching every category.
    pub fn with_sample_site(self) -> Self {
        self.write(
            "src/sites/index.html",
            "<html><head>\n//= ../templates/head.html\n</head><body><h1><%= title %></h1></body></html>\n",
        );
        self.write("src/templates/head.html", "<meta charset=\"utf-8\">\n");
        self.write(
            "src/assets/css/main.scss",
            "@import \"partials/nav\";\n$brand: #ff0000;\n.page { color: $brand; }\n",
        );
        self.write("src/assets/css/partials/_nav.scss", ".nav { margin: 0; }\n");
        self.write(
            "src/assets/js/main.js",
            "function start(value) { var doubled = value * 2; return doubled; }\nstart(21);\n",
        );
        self.write("src/assets/img/photo.jpg", [0xffu8, 0xd8, 0xff, 0xe0, 0x00, 0x10]);
        self.write(
            "src/assets/img/svg/logo.svg",
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"24\" height=\"24\" viewBox=\"0 0 24 24\"><path d=\"M0 0L10 10\"/></svg>\n",
        );
        self.write(
            "src/assets/img/svg/sprite/arrow.svg",
            "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 10 10\"><path d=\"M0 0L10 5L0 10z\"/></svg>\n",
        );
        self.write("src/assets/fonts/body.woff2", [0x77u8, 0x4f, 0x46, 0x32]);
        self.write("src/assets/vendors/by_bower/jquery/jquery.js", "/* jquery */\n");
        self.write("src/assets/vendors/by_hands/plugin.css", ".plugin{}\n");
        self
    }
}

impl Default for TempProject {
    fn default() -> Self {
        Self::new()
    }
}
