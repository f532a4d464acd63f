//! Fixture site for resolver tests.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::ResolverConfig;
use crate::resolver::PageResolver;
use crate::response::{Body, ResponseDescriptor};

/// Temporary site with `pages/`, `items/`, `partials/` and a not-found template.
pub(crate) struct Site {
    dir: TempDir,
}

impl Site {
    pub(crate) fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["pages", "items", "partials"] {
            std::fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        std::fs::write(dir.path().join("not_found.jinja"), "not found: {{ active_path }}").unwrap();
        Self { dir }
    }

    pub(crate) fn write(&self, relative: &str, content: &str) -> &Self {
        let path = self.dir.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
        self
    }

    pub(crate) fn mkdir(&self, relative: &str) -> &Self {
        std::fs::create_dir_all(self.dir.path().join(relative)).unwrap();
        self
    }

    pub(crate) fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub(crate) fn root(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn config(&self) -> ResolverConfig {
        ResolverConfig {
            pages_dir: self.path("pages"),
            items_dir: self.path("items"),
            partials_dir: self.path("partials"),
            not_found_template: self.path("not_found.jinja"),
            ..ResolverConfig::default()
        }
    }

    pub(crate) async fn resolver(&self) -> PageResolver {
        PageResolver::new(self.config()).await.unwrap()
    }
}

/// Body of `response` as text, draining streams.
pub(crate) async fn body(response: ResponseDescriptor) -> String {
    match response.body {
        Body::Empty => String::new(),
        Body::Text(text) => text,
        Body::Stream(stream) => stream.read_to_string().await.unwrap(),
    }
}
