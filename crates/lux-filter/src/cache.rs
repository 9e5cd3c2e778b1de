//! LRU cache for bilateral results.
//!
//! Entries are bucketed by content hash; each bucket holds the sigma
//! variants computed for that content. Recency is a monotonic tick stamped
//! on insert and on every hit; eviction removes the smallest stamp.
//!
//! The cache itself is not synchronized. [`crate::FilterEngine`] wraps it
//! in a mutex and only holds the lock around these calls.

use std::collections::HashMap;
use std::sync::Arc;

use lux_core::LinearImage;
use tracing::trace;

use crate::hash::HashKey;

/// One cached result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Key the result was computed for
    pub key: HashKey,
    /// Filter output
    pub image: Arc<LinearImage>,
    /// Cost charged against the byte budget (`w * h * 3 * 4`)
    pub bytes: usize,
    /// Recency stamp
    pub last_access: u64,
}

/// Outcome of [`FilterCache::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Whether the entry was stored
    pub stored: bool,
    /// Entries evicted to make room
    pub evicted: usize,
}

/// Size- and count-bounded LRU cache.
#[derive(Debug)]
pub struct FilterCache {
    buckets: HashMap<u64, Vec<CacheEntry>>,
    entries: usize,
    bytes: usize,
    max_entries: usize,
    max_bytes: usize,
    tick: u64,
}

impl FilterCache {
    /// Creates an empty cache.
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        Self {
            buckets: HashMap::new(),
            entries: 0,
            bytes: 0,
            max_entries,
            max_bytes,
            tick: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        self.entries
    }

    /// `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Bytes charged by cached results.
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Current limits as `(max_entries, max_bytes)`.
    pub fn limits(&self) -> (usize, usize) {
        (self.max_entries, self.max_bytes)
    }

    /// Looks up `key`, refreshing its recency on a hit.
    pub fn get(&mut self, key: &HashKey) -> Option<Arc<LinearImage>> {
        let tick = self.next_tick();
        let entry = self
            .buckets
            .get_mut(&key.hash)?
            .iter_mut()
            .find(|e| e.key.matches(key))?;
        entry.last_access = tick;
        Some(Arc::clone(&entry.image))
    }

    /// `true` if `key` is cached; does not touch recency.
    pub fn contains(&self, key: &HashKey) -> bool {
        self.buckets
            .get(&key.hash)
            .is_some_and(|b| b.iter().any(|e| e.key.matches(key)))
    }

    /// Stores `image` under `key`, evicting least recently used entries
    /// until both budgets hold.
    ///
    /// A result larger than the whole byte budget is not stored. An
    /// existing entry for the same key is replaced.
    pub fn insert(&mut self, key: HashKey, image: Arc<LinearImage>) -> InsertOutcome {
        let bytes = image.byte_size();
        if bytes > self.max_bytes || self.max_entries == 0 {
            trace!(bytes, max = self.max_bytes, "result exceeds cache budget, not stored");
            return InsertOutcome {
                stored: false,
                evicted: 0,
            };
        }
        self.remove(&key);

        let mut evicted = 0;
        while self.entries + 1 > self.max_entries || self.bytes + bytes > self.max_bytes {
            if !self.evict_lru() {
                break;
            }
            evicted += 1;
        }

        let last_access = self.next_tick();
        self.buckets.entry(key.hash).or_default().push(CacheEntry {
            key,
            image,
            bytes,
            last_access,
        });
        self.entries += 1;
        self.bytes += bytes;
        InsertOutcome { stored: true, evicted }
    }

    /// Removes `key`; returns whether it was present.
    pub fn remove(&mut self, key: &HashKey) -> bool {
        let Some(bucket) = self.buckets.get_mut(&key.hash) else {
            return false;
        };
        let Some(pos) = bucket.iter().position(|e| e.key.matches(key)) else {
            return false;
        };
        let entry = bucket.swap_remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(&key.hash);
        }
        self.entries -= 1;
        self.bytes -= entry.bytes;
        true
    }

    /// Evicts the least recently used entry; `false` if empty.
    pub fn evict_lru(&mut self) -> bool {
        let oldest = self
            .buckets
            .values()
            .flatten()
            .min_by_key(|e| e.last_access)
            .map(|e| e.key);
        match oldest {
            Some(key) => {
                trace!(hash = key.hash, "evicting cached result");
                self.remove(&key)
            }
            None => false,
        }
    }

    /// Applies new limits, evicting until both hold. Returns the number of
    /// evicted entries.
    pub fn set_limits(&mut self, max_entries: usize, max_bytes: usize) -> usize {
        self.max_entries = max_entries;
        self.max_bytes = max_bytes;
        let mut evicted = 0;
        while (self.entries > self.max_entries || self.bytes > self.max_bytes) && self.evict_lru() {
            evicted += 1;
        }
        evicted
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.entries = 0;
        self.bytes = 0;
    }
}
