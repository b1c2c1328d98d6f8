//! Derived value storage.

use std::sync::RwLock;

use lru::LruCache;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

struct Entries {
    values: LruCache<String, String>,
    /// Bumped by every flush; a value computed under an older generation is dropped.
    generation: u64,
}

/// LRU map from rendered cache key to serialized value.
pub struct DerivedStore {
    entries: RwLock<Entries>,
}

/// Outcome of a guarded insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    Stored { evicted: Option<String> },
    Stale,
}

impl DerivedStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(Entries {
                values: LruCache::new(config.entry_limit_non_zero()),
                generation: 0,
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        // LRU lookups reorder entries, so reads take the write lock.
        rw_write(&self.entries, SOURCE, "get")
            .values
            .get(key)
            .cloned()
    }

    pub fn generation(&self) -> u64 {
        rw_read(&self.entries, SOURCE, "generation").generation
    }

    /// Store `value` unless a flush happened since `generation` was read.
    pub fn put_if_current(&self, key: String, value: String, generation: u64) -> PutOutcome {
        let mut entries = rw_write(&self.entries, SOURCE, "put_if_current");
        if entries.generation != generation {
            return PutOutcome::Stale;
        }
        let evicted = entries
            .values
            .push(key.clone(), value)
            .and_then(|(evicted_key, _)| (evicted_key != key).then_some(evicted_key));
        PutOutcome::Stored { evicted }
    }

    /// Drop every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "clear");
        let removed = entries.values.len();
        entries.values.clear();
        entries.generation = entries.generation.wrapping_add(1);
        removed
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
