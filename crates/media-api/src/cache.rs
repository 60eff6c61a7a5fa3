//! In-memory response cache with TTL expiry and bounded size.
//!
//! Caches serialized scrape results so repeated requests skip the upstream
//! fetch. Expiry is lazy (checked on read, no background sweep); when the
//! store is full the oldest-inserted entry is evicted first. This is a
//! strict insertion-recency policy, not LRU: reads never refresh an entry.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// One cached response. Overwritten wholesale by a new `set`, never
/// mutated in place.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    inserted_at: Instant,
    /// Monotonic insertion counter. `Instant` can tie on coarse clocks;
    /// eviction order must not.
    seq: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    next_seq: u64,
}

/// Cache manager for scraped API responses
#[derive(Debug)]
pub struct CacheManager {
    ttl: Duration,
    max_entries: usize,
    inner: Mutex<CacheInner>,
}

impl CacheManager {
    /// Create a new cache manager
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Get a cached value if present and not expired.
    ///
    /// An expired entry is removed on the spot and reported absent.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        match inner.entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                debug!(key = key, "Cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                inner.entries.remove(key);
                debug!(key = key, "Cache entry expired");
                None
            }
            None => {
                debug!(key = key, "Cache miss");
                None
            }
        }
    }

    /// Store a value, evicting the oldest-inserted entry when full
    pub fn set(&self, key: &str, value: Value) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if inner.entries.len() >= self.max_entries {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(k, _)| k.clone());
            if let Some(oldest_key) = oldest {
                inner.entries.remove(&oldest_key);
                debug!(key = %oldest_key, "Evicted oldest cache entry");
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                seq,
            },
        );
        debug!(key = key, "Cache stored");
    }

    /// Remove all entries and return the number removed
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let count = inner.entries.len();
        inner.entries.clear();
        debug!(cleared = count, "Cache cleared");
        count
    }

    /// Current number of cached entries
    pub fn size(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.len()
    }
}

/// Build a deterministic cache key from an endpoint name and its parameters.
///
/// Identical requests must map to the same key, distinct requests must
/// never collide; the parts are joined verbatim so the key stays readable
/// in logs.
pub fn cache_key(endpoint: &str, parts: &[&str]) -> String {
    if parts.is_empty() {
        endpoint.to_string()
    } else {
        format!("{}:{}", endpoint, parts.join(":"))
    }
}
