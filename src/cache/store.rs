//! In-process bucket cache storage.
//!
//! Bucket entries live in a sharded concurrent map so lookups proceed while
//! a rebuild writes. The known-keys snapshot sits behind its own lock and is
//! swapped in one step after all bucket writes, which is what lets readers
//! trust that every key the snapshot lists is already resolvable.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use dashmap::DashMap;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Shared map from "HH:MM" bucket keys to the hashes of quotes shown at
/// that time, plus the key set written by the last successful rebuild.
pub struct BucketStore {
    buckets: DashMap<String, Arc<Vec<String>>>,
    known_keys: RwLock<Arc<HashSet<String>>>,
}

impl BucketStore {
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
            known_keys: RwLock::new(Arc::new(HashSet::new())),
        }
    }

    /// Hash list for one bucket, if present. Shares the underlying list, so
    /// a concurrent rebuild replacing the bucket does not invalidate the
    /// returned handle.
    pub fn hashes(&self, bucket: &str) -> Option<Arc<Vec<String>>> {
        self.buckets.get(bucket).map(|entry| entry.value().clone())
    }

    /// The key set published by the most recent successful rebuild.
    pub fn known_keys(&self) -> Arc<HashSet<String>> {
        Arc::clone(&rw_read(&self.known_keys, SOURCE, "known_keys"))
    }

    /// Number of buckets currently resident.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub(crate) fn insert_bucket(&self, key: String, hashes: Vec<String>) {
        self.buckets.insert(key, Arc::new(hashes));
    }

    pub(crate) fn remove_bucket(&self, key: &str) {
        self.buckets.remove(key);
    }

    /// Swap in the key set of a completed rebuild. Must happen after every
    /// bucket write and stale removal of that rebuild.
    pub(crate) fn publish_known_keys(&self, keys: HashSet<String>) {
        *rw_write(&self.known_keys, SOURCE, "publish_known_keys") = Arc::new(keys);
    }
}

impl Default for BucketStore {
    fn default() -> Self {
        Self::new()
    }
}
