//! Time-bounded caching
//!
//! A single map-plus-timestamp cache backs the store-call memo, the per-root
//! snapshot cache and the journal page cache. Each owner constructs its own
//! instance with its own TTL, so two aggregators never share entries.
//!
//! ## Expiry
//!
//! - **Lazy**: `get` treats an entry older than the TTL as absent and drops it
//! - **Active**: `sweep_expired` removes every stale entry in one pass
//!
//! Timestamps come from `tokio::time::Instant`, so paused-clock tests can
//! advance past a TTL without sleeping.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Statistics about cache usage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that returned a live entry
    pub hits: u64,
    /// Lookups that found nothing live
    pub misses: u64,
    /// Entries dropped because they outlived the TTL
    pub expired: u64,
    /// Entries currently held (live or not yet swept)
    pub entry_count: usize,
}

impl CacheStats {
    /// Calculate cache hit ratio (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
}

/// Thread-safe cache whose entries expire a fixed time after insertion
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    stats: Mutex<CacheStats>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache with the given time-to-live
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::default()),
            ttl,
        }
    }

    /// Configured time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a live entry, dropping it if it has expired
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        let mut stats = self.stats.lock();

        let fresh = match entries.get(key) {
            Some(entry) if entry.created_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                stats.expired += 1;
                None
            }
            None => None,
        };

        match fresh {
            Some(value) => {
                stats.hits += 1;
                Some(value)
            }
            None => {
                stats.misses += 1;
                None
            }
        }
    }

    /// Whether a live entry exists, without touching the statistics
    pub fn contains(&self, key: &K) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|entry| entry.created_at.elapsed() < self.ttl)
    }

    /// Insert or replace an entry, stamping it with the current time
    pub fn insert(&self, key: K, value: V) {
        self.entries.lock().insert(
            key,
            CacheEntry {
                value,
                created_at: Instant::now(),
            },
        );
    }

    /// Remove an entry; returns whether one was present
    pub fn invalidate(&self, key: &K) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn sweep_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.created_at.elapsed() < self.ttl);
        let removed = before - entries.len();

        if removed > 0 {
            self.stats.lock().expired += removed as u64;
        }
        removed
    }

    /// Number of held entries, including ones not yet swept
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the usage statistics
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.lock().clone();
        stats.entry_count = self.len();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(30));
        cache.insert("a", 1);

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(cache.get(&"a"), Some(1));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_empty());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expired, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_only_stale_entries() {
        let cache = TtlCache::new(Duration::from_secs(10));
        cache.insert(1, "old");
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.insert(2, "new");
        tokio::time::advance(Duration::from_secs(3)).await;

        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&2));
        assert!(!cache.contains(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reinsert_refreshes_timestamp() {
        let cache = TtlCache::new(Duration::from_secs(10));
        cache.insert("k", 1);
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.insert("k", 2);
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get(&"k"), Some(2));
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("a", 1);
        cache.insert("b", 2);

        assert!(cache.invalidate(&"a"));
        assert!(!cache.invalidate(&"a"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_hit_ratio() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_ratio() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_ratio(), 0.0);
    }
}
