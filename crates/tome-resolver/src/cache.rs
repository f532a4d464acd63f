//! Memoization of disk reads and path lookups.

use std::io;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tome_cache::{Cache, CacheBucket, CacheBucketExt};

use crate::fs;

/// Identifies cache entries to invalidate.
#[derive(Clone, Copy, Debug)]
pub enum CacheKey<'a> {
    /// Directory listing, file body or shared-content tree stored for a path.
    Path(&'a Path),
    /// Resolved page prefix stored for a request path.
    Logical(&'a str),
}

/// Disk read memoization owned by one resolver.
///
/// Entries are written once per key and never expire; content on disk is
/// assumed not to change while the resolver lives.
pub(crate) struct DiskCache {
    cache: Arc<dyn Cache>,
    listings: Box<dyn CacheBucket>,
    files: Box<dyn CacheBucket>,
    page_paths: Box<dyn CacheBucket>,
    shared: Box<dyn CacheBucket>,
}

impl DiskCache {
    pub(crate) fn new(cache: Arc<dyn Cache>) -> Self {
        Self {
            listings: cache.bucket("listings"),
            files: cache.bucket("files"),
            page_paths: cache.bucket("page_paths"),
            shared: cache.bucket("shared"),
            cache,
        }
    }

    /// Names of the non-hidden entries of `dir`, in name order.
    pub(crate) async fn listing(&self, dir: &Path) -> io::Result<Vec<String>> {
        let key = path_key(dir);
        if let Some(names) = self.listings.get_json::<Vec<String>>(&key) {
            tracing::debug!(path = %dir.display(), "Listing cache hit");
            return Ok(names);
        }

        let names: Vec<String> = fs::read_entries(dir)
            .await?
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        self.listings.set_json(&key, &names);
        Ok(names)
    }

    /// Body of the file at `path`.
    ///
    /// Returns `Ok(None)` when the file cannot be read at all; decoding
    /// failures are errors.
    pub(crate) async fn file(&self, path: &Path) -> io::Result<Option<String>> {
        let key = path_key(path);
        if let Some(content) = self.files.get_string(&key) {
            tracing::debug!(path = %path.display(), "File cache hit");
            return Ok(Some(content));
        }

        if !fs::can_read(path).await {
            return Ok(None);
        }
        let content = fs::read_text(path).await?;
        self.files.set_string(&key, &content);
        Ok(Some(content))
    }

    /// Page prefix previously resolved for `url_path`.
    pub(crate) fn page_path(&self, url_path: &str) -> Option<String> {
        self.page_paths.get_string(url_path)
    }

    pub(crate) fn set_page_path(&self, url_path: &str, logical_path: &str) {
        self.page_paths.set_string(url_path, logical_path);
    }

    /// Shared-content tree previously built for `root`.
    pub(crate) fn shared(&self, root: &Path) -> Option<Value> {
        self.shared.get_json(&path_key(root))
    }

    pub(crate) fn set_shared(&self, root: &Path, value: &Value) {
        self.shared.set_json(&path_key(root), value);
    }

    /// Drop the entries stored under `key`.
    pub(crate) fn invalidate(&self, key: CacheKey<'_>) {
        match key {
            CacheKey::Path(path) => {
                let key = path_key(path);
                self.listings.invalidate(&key);
                self.files.invalidate(&key);
                self.shared.invalidate(&key);
            }
            CacheKey::Logical(url_path) => self.page_paths.invalidate(url_path),
        }
    }

    /// Drop every entry.
    pub(crate) fn clear(&self) {
        self.cache.clear();
    }
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
