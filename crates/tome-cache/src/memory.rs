//! In-memory cache implementation.
//!
//! [`MemoryCache`] keeps every bucket in a shared map guarded by a
//! [`RwLock`]. Locks are held only for the duration of a single map
//! operation, so handles can be used freely from async code as long as no
//! guard is kept across an `.await` (none is ever returned to callers).
//!
//! A poisoned lock is treated as a miss on read and as a no-op on write:
//! the cache is an optimisation and never a source of truth.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::{Cache, CacheBucket};

type BucketMap = HashMap<String, Arc<[u8]>>;

/// Process-local [`Cache`] backed by hash maps.
///
/// Cloning is cheap and yields a handle to the same storage.
#[derive(Clone, Default)]
pub struct MemoryCache {
    buckets: Arc<RwLock<HashMap<String, Arc<RwLock<BucketMap>>>>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries stored in a bucket (zero for unknown buckets).
    #[must_use]
    pub fn len(&self, bucket: &str) -> usize {
        let Ok(buckets) = self.buckets.read() else {
            return 0;
        };
        buckets
            .get(bucket)
            .and_then(|entries| entries.read().ok().map(|e| e.len()))
            .unwrap_or(0)
    }

    /// Whether a bucket holds no entries.
    #[must_use]
    pub fn is_empty(&self, bucket: &str) -> bool {
        self.len(bucket) == 0
    }

    fn entries(&self, name: &str) -> Arc<RwLock<BucketMap>> {
        if let Ok(buckets) = self.buckets.read()
            && let Some(entries) = buckets.get(name)
        {
            return Arc::clone(entries);
        }

        match self.buckets.write() {
            Ok(mut buckets) => Arc::clone(buckets.entry(name.to_owned()).or_default()),
            Err(_) => {
                tracing::warn!(bucket = name, "cache lock poisoned, using detached bucket");
                Arc::new(RwLock::new(HashMap::new()))
            }
        }
    }
}

impl Cache for MemoryCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        Box::new(MemoryCacheBucket {
            name: name.to_owned(),
            entries: self.entries(name),
        })
    }

    fn clear(&self) {
        let Ok(buckets) = self.buckets.read() else {
            return;
        };
        for entries in buckets.values() {
            if let Ok(mut entries) = entries.write() {
                entries.clear();
            }
        }
        tracing::debug!("memory cache cleared");
    }
}

/// A single named bucket inside a [`MemoryCache`].
struct MemoryCacheBucket {
    name: String,
    entries: Arc<RwLock<BucketMap>>,
}

impl CacheBucket for MemoryCacheBucket {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let entries = self.entries.read().ok()?;
        entries.get(key).map(|value| value.to_vec())
    }

    fn set(&self, key: &str, value: &[u8]) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_owned(), Arc::from(value));
        }
    }

    fn invalidate(&self, key: &str) {
        if let Ok(mut entries) = self.entries.write()
            && entries.remove(key).is_some()
        {
            tracing::debug!(bucket = %self.name, key, "cache entry invalidated");
        }
    }
}
