use std::time::{Duration, Instant};

use dashmap::DashMap;

struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        let expires_at = if !ttl.is_zero() {
            Some(Instant::now() + ttl)
        } else {
            None
        };
        Self { value, expires_at }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }
}

/// Concurrent key-value store with per-entry expiry.
///
/// Expired entries are invisible to readers and removed lazily on read or by
/// [`TtlStore::purge_expired`]. Values are cloned out, so large values should
/// be stored behind an `Arc`.
pub struct TtlStore<V> {
    data: DashMap<String, CacheEntry<V>>,
}

impl<V: Clone> TtlStore<V> {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(entry) = self.data.get(key) {
            if !entry.is_expired() {
                return Some(entry.value.clone());
            }
        } else {
            return None;
        }

        // Re-check under the write lock; a writer may have replaced the entry.
        self.data.remove_if(key, |_, entry| entry.is_expired());
        None
    }

    /// Insert or replace a value. A zero TTL never expires.
    pub fn insert(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.data.insert(key.into(), CacheEntry::new(value, ttl));
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.data.remove(key).map(|(_, entry)| entry.value)
    }

    /// Drop every expired entry and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.data.len();
        self.data.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(self.data.len())
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<V: Clone> Default for TtlStore<V> {
    fn default() -> Self {
        Self::new()
    }
}
