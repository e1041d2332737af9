//! Local stand-in for the primary backend while it is unreachable.
//!
//! Entries are best effort for the lifetime of the process: the intended ttl
//! is kept for diagnostics but entries never expire, and nothing here is
//! shared with other instances or synced back to the primary.
use crate::backend::CacheValue;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Clone, Debug)]
struct FallbackEntry {
    value: CacheValue,
    ttl: Duration,
}

#[derive(Default)]
pub struct FallbackMap {
    entries: Mutex<HashMap<String, FallbackEntry>>,
}

impl FallbackMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<CacheValue> {
        self.entries.lock().get(key).map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: &str, value: CacheValue, ttl: Duration) {
        self.entries
            .lock()
            .insert(key.to_string(), FallbackEntry { value, ttl });
    }

    /// The ttl the caller asked for when the entry was written.
    pub fn intended_ttl(&self, key: &str) -> Option<Duration> {
        self.entries.lock().get(key).map(|entry| entry.ttl)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
