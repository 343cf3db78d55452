//! # Bounded Header Cache
//!
//! Least-recently-used map from block number to header. Both `get` and
//! `put` refresh recency; inserting into a full cache evicts the entry whose
//! last access is oldest.
//!
//! The cache has its own lock so concurrent header lookups never contend
//! with the statistics lock.

use lru::LruCache;
use parking_lot::Mutex;
use shared_types::Header;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Thread-safe LRU header cache.
pub struct HeaderCache {
    inner: Mutex<LruCache<u64, Arc<Header>>>,
}

impl HeaderCache {
    /// Create a cache holding at most `capacity` headers (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Look up a header, marking it most recently used.
    pub fn get(&self, number: u64) -> Option<Arc<Header>> {
        self.inner.lock().get(&number).cloned()
    }

    /// Insert a header, evicting the least recently used entry when full.
    pub fn put(&self, number: u64, header: Arc<Header>) {
        self.inner.lock().put(number, header);
    }

    /// Membership test that does not touch recency.
    pub fn contains(&self, number: u64) -> bool {
        self.inner.lock().contains(&number)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().cap().get()
    }
}
