//! In-memory result cache with per-entry expiration.
//!
//! Entries expire lazily: nothing purges them in the background, an expired
//! entry is simply dropped the next time it is read. The store is an LRU map
//! bounded by capacity, and time comes from an injected [`Clock`] so tests
//! can move it without sleeping.

mod single_flight;

pub use single_flight::SingleFlight;

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Longest lifetime an entry can be given (ten years).
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Source of the current time for expiration checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock (monotonic) time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Key/value store where each entry carries its own TTL.
///
/// Internally synchronized; share it behind an `Arc`. Values are cloned out
/// on read, so store cheap handles (`Arc<T>`) for large payloads.
pub struct TtlCache<V> {
    entries: Mutex<LruCache<String, Entry<V>>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(capacity: NonZeroUsize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            clock,
        }
    }

    /// Returns the value if present and not expired.
    ///
    /// An entry is a miss once `now >= stored_at + ttl`; expired entries are
    /// removed here.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.lock();

        match entries.get(key) {
            Some(entry) if now < entry.expires_at => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }

        entries.pop(key);
        tracing::debug!(key, "Cache entry expired");
        None
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn insert(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let expires_at = self.clock.now() + ttl.min(MAX_TTL);
        let key = key.into();
        if let Some((evicted, _)) = self.lock().push(key.clone(), Entry { value, expires_at }) {
            if evicted != key {
                tracing::debug!(key = %evicted, "Cache at capacity, evicted least recently used entry");
            }
        }
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60 * 60);

    fn cache(capacity: usize) -> (TtlCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = TtlCache::new(
            NonZeroUsize::new(capacity).unwrap(),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        (cache, clock)
    }

    #[test]
    fn test_get_missing() {
        let (cache, _) = cache(4);
        assert_eq!(cache.get("nope"), None);
    }

    #[test]
    fn test_hit_within_ttl() {
        let (cache, clock) = cache(4);
        cache.insert("podcast-data", "v1".to_string(), TTL);

        clock.advance(TTL - Duration::from_secs(1));
        assert_eq!(cache.get("podcast-data").as_deref(), Some("v1"));
    }

    #[test]
    fn test_oversized_ttl_is_capped() {
        let (cache, clock) = cache(4);
        cache.insert("podcast-data", "v1".to_string(), Duration::MAX);

        clock.advance(MAX_TTL - Duration::from_secs(1));
        assert_eq!(cache.get("podcast-data").as_deref(), Some("v1"));
        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get("podcast-data"), None);
    }

    #[test]
    fn test_miss_at_exact_expiry() {
        let (cache, clock) = cache(4);
        cache.insert("podcast-data", "v1".to_string(), TTL);

        clock.advance(TTL);
        assert_eq!(cache.get("podcast-data"), None);
    }

    #[test]
    fn test_expired_entry_removed_lazily() {
        let (cache, clock) = cache(4);
        cache.insert("a", "v".to_string(), Duration::from_secs(1));
        clock.advance(Duration::from_secs(5));

        // Still stored until someone reads it.
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_replaces_and_resets_ttl() {
        let (cache, clock) = cache(4);
        cache.insert("k", "old".to_string(), Duration::from_secs(10));
        clock.advance(Duration::from_secs(8));
        cache.insert("k", "new".to_string(), Duration::from_secs(10));
        clock.advance(Duration::from_secs(8));

        assert_eq!(cache.get("k").as_deref(), Some("new"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_per_entry_ttl() {
        let (cache, clock) = cache(4);
        cache.insert("short", "s".to_string(), Duration::from_secs(1));
        cache.insert("long", "l".to_string(), Duration::from_secs(100));
        clock.advance(Duration::from_secs(2));

        assert_eq!(cache.get("short"), None);
        assert_eq!(cache.get("long").as_deref(), Some("l"));
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let (cache, _) = cache(2);
        cache.insert("a", "1".to_string(), TTL);
        cache.insert("b", "2".to_string(), TTL);
        assert!(cache.get("a").is_some());
        cache.insert("c", "3".to_string(), TTL);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b"), None);
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_shared_across_threads() {
        let (cache, _) = cache(64);
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache.insert(format!("k{i}"), i.to_string(), TTL);
                    cache.get(&format!("k{i}"))
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), Some(i.to_string()));
        }
    }
}
