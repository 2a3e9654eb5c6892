//! TTL key/value cache for service-level computed results.
//!
//! # Responsibility
//! - Memoize expensive read-side computations (statistics, aggregates).
//! - Let write paths drop stale entries by key or key prefix.
//!
//! # Invariants
//! - Expired entries are never returned; they are evicted lazily on access.
//! - Failed computations are never cached.
//! - With `max_entries`, the cache never holds more than that many entries.

use dashmap::DashMap;
use log::debug;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    /// `None` when `now + ttl` does not fit in an `Instant`.
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Instant::now() >= expires_at)
    }
}

/// Thread-safe TTL cache keyed by strings such as `jeux:stats:numbers`.
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    default_ttl: Duration,
    max_entries: Option<usize>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            max_entries: None,
        }
    }

    /// Caps the number of live entries.
    #[must_use]
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries.max(1));
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn get(&self, key: &str) -> Option<V> {
        {
            let entry = self.entries.get(key)?;
            if !entry.is_expired() {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| entry.is_expired());
        debug!("event=cache_get module=cache status=expired");
        None
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    pub fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        if !self.entries.contains_key(&key) {
            self.enforce_max_entries();
        }
        self.entries.insert(key, CacheEntry::new(value, ttl));
    }

    /// Returns the cached value or computes, caches and returns it.
    ///
    /// Errors from `compute` are returned unchanged and leave the cache
    /// untouched.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: &str,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(key) {
            debug!("event=cache_get module=cache status=hit");
            return Ok(value);
        }
        debug!("event=cache_get module=cache status=miss");
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drops every entry whose key starts with `prefix`. Returns the count.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        before.saturating_sub(self.entries.len())
    }

    /// Removes expired entries. Returns the count.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, including not-yet-evicted expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn enforce_max_entries(&self) {
        let Some(max) = self.max_entries else {
            return;
        };
        if self.entries.len() < max {
            return;
        }
        self.purge_expired();
        while self.entries.len() >= max {
            let victim = self
                .entries
                .iter()
                .min_by_key(|entry| {
                    let expires_at = entry.value().expires_at;
                    (expires_at.is_none(), expires_at)
                })
                .map(|entry| entry.key().clone());
            match victim {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TtlCache;
    use std::cell::Cell;
    use std::time::Duration;

    #[test]
    fn insert_then_get_returns_value() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("a", 1);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn zero_ttl_entries_are_expired_and_evicted_on_access() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert_with_ttl("a", 1, Duration::ZERO);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn compute_runs_once_while_fresh() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let calls = Cell::new(0);
        for _ in 0..3 {
            let value: Result<i32, ()> = cache.get_or_try_insert_with("k", || {
                calls.set(calls.get() + 1);
                Ok(7)
            });
            assert_eq!(value, Ok(7));
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn failed_compute_is_not_cached() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(60));
        let first: Result<i32, &str> = cache.get_or_try_insert_with("k", || Err("boom"));
        assert_eq!(first, Err("boom"));
        assert!(cache.is_empty());
        let second: Result<i32, &str> = cache.get_or_try_insert_with("k", || Ok(3));
        assert_eq!(second, Ok(3));
    }

    #[test]
    fn invalidate_prefix_only_touches_matching_keys() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("jeux:stats:numbers", 1);
        cache.insert("jeux:stats:stars", 2);
        cache.insert("recipes:stats", 3);
        assert_eq!(cache.invalidate_prefix("jeux:"), 2);
        assert_eq!(cache.get("recipes:stats"), Some(3));
        assert!(cache.invalidate("recipes:stats"));
        assert!(!cache.invalidate("recipes:stats"));
    }

    #[test]
    fn max_entries_evicts_closest_to_expiry() {
        let cache = TtlCache::new(Duration::from_secs(60)).with_max_entries(2);
        cache.insert_with_ttl("short", 1, Duration::from_secs(5));
        cache.insert_with_ttl("long", 2, Duration::from_secs(500));
        cache.insert("new", 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("short"), None);
        assert_eq!(cache.get("long"), Some(2));
        assert_eq!(cache.get("new"), Some(3));
    }

    #[test]
    fn huge_ttl_never_expires() {
        let cache = TtlCache::new(Duration::MAX);
        cache.insert("k", 1);
        assert_eq!(cache.get("k"), Some(1));
        assert_eq!(cache.purge_expired(), 0);
    }

    #[test]
    fn max_entries_prefers_evicting_finite_ttl() {
        let cache = TtlCache::new(Duration::MAX).with_max_entries(2);
        cache.insert("forever", 1);
        cache.insert_with_ttl("bounded", 2, Duration::from_secs(500));
        cache.insert("new", 3);
        assert_eq!(cache.get("bounded"), None);
        assert_eq!(cache.get("forever"), Some(1));
        assert_eq!(cache.get("new"), Some(3));
    }

    #[test]
    fn expired_lookup_keeps_fresh_replacement() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert_with_ttl("k", 1, Duration::ZERO);
        assert_eq!(cache.get("k"), None);
        cache.insert("k", 2);
        assert_eq!(cache.get("k"), Some(2));
    }

    #[test]
    fn overwriting_existing_key_does_not_evict() {
        let cache = TtlCache::new(Duration::from_secs(60)).with_max_entries(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("b", 20);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), Some(20));
    }
}
