//! Cache abstraction layer for Tome.
//!
//! This crate provides the caching traits the resolver memoizes disk reads
//! through. Two traits form the core API:
//!
//! - [`Cache`]: Factory for named cache buckets
//! - [`CacheBucket`]: Write-once key-value store with explicit invalidation
//!
//! Entries never expire on their own. The backing content is assumed to be
//! immutable for the lifetime of the cache; [`CacheBucket::invalidate`] and
//! [`Cache::clear`] exist for callers that know better.
//!
//! # Implementations
//!
//! - [`NullCache`] / [`NullCacheBucket`]: No-op implementations (always miss)
//! - [`MemoryCache`]: Process-local implementation backed by hash maps
//!
//! # Example
//!
//! ```
//! use tome_cache::{Cache, MemoryCache};
//!
//! let cache = MemoryCache::new();
//! let bucket = cache.bucket("files");
//! bucket.set("/site/pages/home/intro.md", b"# Hello");
//! assert_eq!(bucket.get("/site/pages/home/intro.md"), Some(b"# Hello".to_vec()));
//! ```

mod ext;
mod memory;

pub use ext::CacheBucketExt;
pub use memory::MemoryCache;

/// A named partition within a [`Cache`].
///
/// Each bucket stores key-value pairs. Writes for the same key are expected
/// to be idempotent: two concurrent first-time misses that compute the same
/// value may both store it, and the last writer wins.
pub trait CacheBucket: Send + Sync {
    /// Retrieve a cached value.
    ///
    /// Returns `None` on cache miss.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store a value in the cache.
    ///
    /// Overwrites any existing entry for the same key.
    fn set(&self, key: &str, value: &[u8]);

    /// Drop a single entry. Missing keys are ignored.
    fn invalidate(&self, key: &str);
}

/// Factory for named cache [`CacheBucket`]s.
///
/// A `Cache` produces buckets that are logically isolated from each other.
/// Calling `bucket` multiple times with the same name returns handles that
/// share the same underlying storage.
pub trait Cache: Send + Sync {
    /// Open or create a named bucket.
    ///
    /// # Arguments
    ///
    /// * `name` - Bucket name (e.g., "files", "listings", "page_paths")
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket>;

    /// Drop every entry in every bucket.
    fn clear(&self);
}

/// No-op [`CacheBucket`] that never stores or retrieves data.
///
/// Every `get` returns `None`; every `set` is silently discarded.
/// Used as the bucket type for [`NullCache`].
pub struct NullCacheBucket;

impl CacheBucket for NullCacheBucket {
    fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&self, _key: &str, _value: &[u8]) {}

    fn invalidate(&self, _key: &str) {}
}

/// No-op [`Cache`] that always returns [`NullCacheBucket`]s.
///
/// Use when caching is disabled. All operations are no-ops and all lookups
/// return `None`.
pub struct NullCache;

impl Cache for NullCache {
    fn bucket(&self, _name: &str) -> Box<dyn CacheBucket> {
        Box::new(NullCacheBucket)
    }

    fn clear(&self) {}
}
