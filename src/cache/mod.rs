//! Freshness-keyed response caching.
//!
//! Performance critical report queries can be routed through the
//! [`FreshnessCache`]. An entry stays valid as long as its fingerprint and
//! its query descriptor are unchanged; nothing is ever evicted by size or
//! age. This is a correctness-by-freshness cache, not an LRU.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;

/// Opaque comparable value representing the latest known state of a data
/// source, e.g. the highest known log record id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Fingerprint {
    /// The source holds no data yet.
    Null,
    Int(i64),
    Text(String),
}

impl From<Option<i64>> for Fingerprint {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Fingerprint::Null, Fingerprint::Int)
    }
}

impl From<i64> for Fingerprint {
    fn from(value: i64) -> Self {
        Fingerprint::Int(value)
    }
}

impl From<Option<String>> for Fingerprint {
    fn from(value: Option<String>) -> Self {
        value.map_or(Fingerprint::Null, Fingerprint::Text)
    }
}

impl From<&str> for Fingerprint {
    fn from(value: &str) -> Self {
        Fingerprint::Text(value.to_string())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    fingerprint: Fingerprint,
    query: String,
    value: Value,
}

/// Single-slot-per-key cache keyed on data freshness.
#[derive(Debug, Default)]
pub struct FreshnessCache {
    entries: DashMap<String, CacheEntry>,
}

impl FreshnessCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `key` from the cache if nothing relevant has changed.
    ///
    /// `compute` runs when no entry exists for `key`, or when the stored
    /// fingerprint or query descriptor differs from what is passed in; the
    /// new triple then overwrites the slot. The entry API holds the shard
    /// lock across the check and the write, so same-key resolves do not
    /// lose updates to each other.
    pub fn resolve<F>(&self, key: &str, fingerprint: Fingerprint, query: &str, compute: F) -> Value
    where
        F: FnOnce() -> Value,
    {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get();
                if entry.fingerprint == fingerprint && entry.query == query {
                    crate::observability::metrics::record_cache_lookup(true);
                    return entry.value.clone();
                }
                crate::observability::metrics::record_cache_lookup(false);
                let value = compute();
                occupied.insert(CacheEntry {
                    fingerprint,
                    query: query.to_string(),
                    value: value.clone(),
                });
                value
            }
            Entry::Vacant(vacant) => {
                crate::observability::metrics::record_cache_lookup(false);
                let value = compute();
                vacant.insert(CacheEntry {
                    fingerprint,
                    query: query.to_string(),
                    value: value.clone(),
                });
                value
            }
        }
    }

    /// Number of distinct keys ever resolved.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
