//! Bounded in-memory cache with per-entry TTL and LRU eviction.
//!
//! Recency lives in an `lru::LruCache` (hash map + intrusive doubly-linked list),
//! so promote and evict are O(1). Capacity is enforced here rather than by the
//! `lru` crate so that exactly one entry is evicted before a new key is inserted.
//! Expired entries are dropped lazily on `get` and eagerly by `sweep_expired`,
//! which the maintenance task runs on a fixed period.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::clock::Clock;

struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    last_accessed: Instant,
    expires_at: Instant,
}

/// Snapshot of a cache's size and configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub ttl_secs: u64,
}

pub struct ExpiringLruCache<V> {
    name: &'static str,
    inner: Mutex<LruCache<String, CacheEntry<V>>>,
    max_size: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> ExpiringLruCache<V> {
    /// `name` only labels log events.
    pub fn new(name: &'static str, max_size: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            inner: Mutex::new(LruCache::unbounded()),
            max_size,
            ttl,
            clock,
        }
    }

    /// Look up `key`. Returns None if absent or expired; expired entries are removed.
    /// A hit promotes the key to most-recently-used.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut cache = self.inner.lock();

        let expired = now > cache.peek(key)?.expires_at;
        if expired {
            cache.pop(key);
            debug!(cache = self.name, "cache_entry_expired");
            return None;
        }

        let entry = cache.get_mut(key)?;
        debug!(
            cache = self.name,
            age_ms = now.duration_since(entry.created_at).as_millis() as u64,
            idle_ms = now.duration_since(entry.last_accessed).as_millis() as u64,
            "cache_hit"
        );
        entry.last_accessed = now;
        Some(entry.value.clone())
    }

    /// Insert with the cache's configured TTL.
    pub fn set(&self, key: String, value: V) {
        self.set_with_ttl(key, value, self.ttl);
    }

    /// Insert or overwrite `key`, expiring `ttl` from now.
    /// Inserting a new key into a full cache evicts the least-recently-used entry first.
    pub fn set_with_ttl(&self, key: String, value: V, ttl: Duration) {
        if self.max_size == 0 {
            return;
        }

        let now = self.clock.now();
        let Some(expires_at) = now.checked_add(ttl) else {
            warn!(cache = self.name, ttl_secs = ttl.as_secs(), "ttl overflows the clock, entry not cached");
            return;
        };
        let mut cache = self.inner.lock();

        if !cache.contains(key.as_str()) && cache.len() >= self.max_size {
            if let Some((evicted, _)) = cache.pop_lru() {
                debug!(cache = self.name, key = %evicted, "cache_evicted");
            }
        }

        cache.put(
            key,
            CacheEntry {
                value,
                created_at: now,
                last_accessed: now,
                expires_at,
            },
        );
    }

    /// Remove every entry whose expiry has passed. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut cache = self.inner.lock();

        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| now > entry.expires_at)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            cache.pop(key.as_str());
        }

        if !expired.is_empty() {
            debug!(cache = self.name, removed = expired.len(), "cache_sweep");
        }
        expired.len()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            max_size: self.max_size,
            ttl_secs: self.ttl.as_secs(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache(max_size: usize, ttl_secs: u64) -> (ExpiringLruCache<u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = ExpiringLruCache::new(
            "test",
            max_size,
            Duration::from_secs(ttl_secs),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        (cache, clock)
    }

    #[test]
    fn get_returns_inserted_value() {
        let (cache, _) = cache(4, 60);
        cache.set("a".into(), 1);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn size_never_exceeds_max_size() {
        let (cache, _) = cache(3, 60);
        for i in 0..20 {
            cache.set(format!("k{i}"), i);
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn full_cache_evicts_least_recently_used() {
        let (cache, _) = cache(3, 60);
        cache.set("a".into(), 1);
        cache.set("b".into(), 2);
        cache.set("c".into(), 3);

        cache.set("d".into(), 4);

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.get("d"), Some(4));
    }

    #[test]
    fn read_before_insert_protects_key_from_eviction() {
        let (cache, _) = cache(3, 60);
        cache.set("a".into(), 1);
        cache.set("b".into(), 2);
        cache.set("c".into(), 3);

        assert_eq!(cache.get("a"), Some(1));
        cache.set("d".into(), 4);

        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn overwrite_does_not_evict_and_refreshes_expiry() {
        let (cache, clock) = cache(2, 10);
        cache.set("a".into(), 1);
        cache.set("b".into(), 2);

        clock.advance(Duration::from_secs(8));
        cache.set("a".into(), 10);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b"), Some(2));

        clock.advance(Duration::from_secs(5));
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn get_after_expiry_is_absent_and_shrinks_size() {
        let (cache, clock) = cache(4, 10);
        cache.set("a".into(), 1);

        clock.advance(Duration::from_secs(10));
        assert_eq!(cache.get("a"), Some(1), "expiry is strictly after expires_at");

        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let (cache, clock) = cache(8, 10);
        cache.set("old".into(), 1);
        clock.advance(Duration::from_secs(6));
        cache.set("new".into(), 2);
        cache.set_with_ttl("long".into(), 3, Duration::from_secs(600));

        clock.advance(Duration::from_secs(6));
        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("new"), Some(2));
        assert_eq!(cache.get("long"), Some(3));
    }

    #[test]
    fn eviction_order_follows_insertion_when_untouched() {
        let (cache, _) = cache(2, 60);
        cache.set("first".into(), 1);
        cache.set("second".into(), 2);
        cache.set("third".into(), 3);
        assert_eq!(cache.get("first"), None);

        cache.set("fourth".into(), 4);
        assert_eq!(cache.get("second"), None);
    }

    #[test]
    fn clear_and_stats() {
        let (cache, _) = cache(5, 90);
        cache.set("a".into(), 1);
        cache.set("b".into(), 2);
        assert_eq!(
            cache.stats(),
            CacheStats {
                size: 2,
                max_size: 5,
                ttl_secs: 90
            }
        );

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn unrepresentable_ttl_is_skipped_without_panicking() {
        let (cache, _) = cache(4, 60);
        cache.set("a".into(), 1);
        cache.set_with_ttl("b".into(), 2, Duration::MAX);

        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zero_capacity_cache_stores_nothing() {
        let (cache, _) = cache(0, 60);
        cache.set("a".into(), 1);
        assert!(cache.is_empty());
    }
}
