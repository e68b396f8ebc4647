use std::collections::{HashMap, HashSet};

use super::{QueryKey, QueryValue, Tag};

/// One cached query result.
#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
    pub value: Option<QueryValue>,
    /// Message of the last failed fetch, cleared by the next successful one
    pub error: Option<String>,
    /// Set by invalidation until a fresh result replaces the value
    pub stale: bool,
    pub in_flight: bool,
    generation: u64,
}

/// Handle for one issued fetch. Only the most recent ticket for a key may
/// write its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub key: QueryKey,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Superseded,
}

/// Query results keyed by query identity, with a tag index for invalidation.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<QueryKey, CacheEntry>,
    tag_index: HashMap<Tag, HashSet<QueryKey>>,
    // Shared across keys so a ticket never matches an entry recreated after eviction
    next_generation: u64,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &QueryKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn value(&self, key: &QueryKey) -> Option<&QueryValue> {
        self.entries.get(key).and_then(|e| e.value.as_ref())
    }

    /// Register a new fetch for `key`. Any fetch already in flight for the
    /// same key is superseded.
    pub fn begin_fetch(&mut self, key: QueryKey) -> Ticket {
        for tag in key.tags() {
            self.tag_index.entry(tag).or_default().insert(key);
        }
        self.next_generation += 1;
        let entry = self.entries.entry(key).or_default();
        entry.generation = self.next_generation;
        entry.in_flight = true;
        Ticket {
            key,
            generation: entry.generation,
        }
    }

    /// Store the outcome of a fetch. The previous value is replaced in one
    /// step; a failed fetch keeps it but records the error.
    pub fn complete(&mut self, ticket: Ticket, result: Result<QueryValue, String>) -> Completion {
        let Some(entry) = self.entries.get_mut(&ticket.key) else {
            return Completion::Superseded;
        };
        if entry.generation != ticket.generation {
            return Completion::Superseded;
        }

        entry.in_flight = false;
        match result {
            Ok(value) => {
                entry.value = Some(value);
                entry.error = None;
                entry.stale = false;
            }
            Err(message) => entry.error = Some(message),
        }
        Completion::Applied
    }

    /// Mark every cached query carrying one of `tags` as stale and return
    /// their keys.
    pub fn invalidate(&mut self, tags: &[Tag]) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = Vec::new();
        for tag in tags {
            if let Some(tagged) = self.tag_index.get(tag) {
                for key in tagged {
                    if !keys.contains(key) {
                        keys.push(*key);
                    }
                }
            }
        }

        for key in &keys {
            if let Some(entry) = self.entries.get_mut(key) {
                entry.stale = true;
            }
        }
        keys
    }

    /// Drop a key entirely. Tickets issued for it become superseded.
    pub fn evict(&mut self, key: &QueryKey) {
        self.entries.remove(key);
        for tag in key.tags() {
            if let Some(tagged) = self.tag_index.get_mut(&tag) {
                tagged.remove(key);
                if tagged.is_empty() {
                    self.tag_index.remove(&tag);
                }
            }
        }
    }
}
