//! Short-lived memory of fallback index values, keyed by city id.
//!
//! When the provider is down each refresh synthesizes a new index. Starting from
//! the previous synthesized value keeps consecutive refreshes within a few points
//! of each other instead of jumping around. Entries expire so the value can
//! drift back to a fresh draw after a while.

use crate::clock::Clock;
use crate::random::RandomSource;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Default expiry window for cache entries.
pub const DEFAULT_FALLBACK_TTL_MINUTES: i64 = 30;

/// Lower and upper bound for a value derived from a cached one.
pub const DERIVED_RANGE: (f64, f64) = (25.0, 90.0);
/// Maximum step away from a cached value.
pub const MAX_STEP: f64 = 4.0;
/// Range of a first-time draw.
pub const FRESH_RANGE: (f64, f64) = (40.0, 70.0);

/// Last fallback value for one city and when it was recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackCacheEntry {
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Owned, thread-safe fallback store. Share it with `Arc`.
///
/// Concurrent derivations for the same city are last-write-wins.
pub struct FallbackCache {
    entries: Mutex<HashMap<String, FallbackCacheEntry>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl FallbackCache {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, FallbackCacheEntry>> {
        // The map is only ever mutated by single inserts/removes.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// An expiry window reaching past the representable time range expires nothing.
    fn purge_locked(&self, entries: &mut HashMap<String, FallbackCacheEntry>) -> usize {
        let Some(cutoff) = self.clock.now().checked_sub_signed(self.ttl) else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|_, entry| entry.recorded_at >= cutoff);
        before - entries.len()
    }

    /// Drops every entry recorded before `now - ttl`. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.lock();
        let removed = self.purge_locked(&mut entries);
        if removed > 0 {
            debug!("Purged {} expired fallback cache entries", removed);
        }
        removed
    }

    /// Cached value for `city_id`, after purging expired entries.
    pub fn get(&self, city_id: &str) -> Option<f64> {
        let mut entries = self.lock();
        self.purge_locked(&mut entries);
        entries.get(city_id).map(|entry| entry.value)
    }

    /// Full entry for `city_id`, after purging expired entries.
    #[cfg(test)]
    pub fn entry(&self, city_id: &str) -> Option<FallbackCacheEntry> {
        let mut entries = self.lock();
        self.purge_locked(&mut entries);
        entries.get(city_id).copied()
    }

    /// Upserts `value` stamped with the current time.
    pub fn set(&self, city_id: &str, value: f64) {
        let recorded_at = self.clock.now();
        let mut entries = self.lock();
        entries
            .entry(city_id.to_string())
            .and_modify(|entry| {
                entry.value = value;
                entry.recorded_at = recorded_at;
            })
            .or_insert(FallbackCacheEntry { value, recorded_at });
    }

    /// Computes the next fallback value for `city_id` and writes it back.
    ///
    /// With a live entry the value takes a bounded step: `clamp(x ± 4, 25, 90)`.
    /// Without one it is a fresh draw from `[40, 70)`.
    pub fn derive_next(&self, city_id: &str, random: &dyn RandomSource) -> f64 {
        let next = match self.get(city_id) {
            Some(previous) => {
                let step = random.uniform(-MAX_STEP, MAX_STEP);
                (previous + step).clamp(DERIVED_RANGE.0, DERIVED_RANGE.1)
            },
            None => random.uniform(FRESH_RANGE.0, FRESH_RANGE.1),
        };
        debug!("Fallback index for {}: {:.1}", city_id, next);
        self.set(city_id, next);
        next
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::random::{FixedRandom, ThreadRandom};
    use chrono::TimeZone;

    fn cache() -> (Arc<ManualClock>, FallbackCache) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
        ));
        let cache = FallbackCache::new(
            clock.clone(),
            Duration::minutes(DEFAULT_FALLBACK_TTL_MINUTES),
        );
        (clock, cache)
    }

    #[test]
    fn test_set_then_get() {
        let (_clock, cache) = cache();
        cache.set("paris", 55.5);
        assert_eq!(cache.get("paris"), Some(55.5));
        assert_eq!(cache.get("lyon"), None);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let (clock, cache) = cache();
        cache.set("paris", 55.5);

        clock.advance(Duration::minutes(30));
        assert_eq!(cache.get("paris"), Some(55.5), "exactly 30 minutes is still valid");

        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get("paris"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_refreshes_timestamp() {
        let (clock, cache) = cache();
        cache.set("nice", 50.0);
        clock.advance(Duration::minutes(20));
        cache.set("nice", 52.0);
        clock.advance(Duration::minutes(20));

        let entry = cache.entry("nice").unwrap();
        assert_eq!(entry.value, 52.0);
        assert_eq!(entry.recorded_at, clock.now() - Duration::minutes(20));
    }

    #[test]
    fn test_purge_only_removes_stale_entries() {
        let (clock, cache) = cache();
        cache.set("old", 40.0);
        clock.advance(Duration::minutes(25));
        cache.set("new", 60.0);
        clock.advance(Duration::minutes(10));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("new"), Some(60.0));
    }

    #[test]
    fn test_fresh_derivation_range_and_write_back() {
        let (_clock, cache) = cache();
        let value = cache.derive_next("lille", &FixedRandom(0.0));
        assert_eq!(value, 40.0);
        assert_eq!(cache.get("lille"), Some(40.0));

        for i in 0..200 {
            let id = format!("city-{}", i);
            let value = cache.derive_next(&id, &ThreadRandom);
            assert!((40.0..=70.0).contains(&value));
        }
    }

    #[test]
    fn test_derivation_is_bounded_step() {
        let (_clock, cache) = cache();
        for start in [26.0, 50.0, 88.0] {
            for _ in 0..100 {
                cache.set("lyon", start);
                let next = cache.derive_next("lyon", &ThreadRandom);
                let low = (start - MAX_STEP).max(DERIVED_RANGE.0);
                let high = (start + MAX_STEP).min(DERIVED_RANGE.1);
                assert!(next >= low && next <= high, "{} not in [{}, {}]", next, low, high);
            }
        }
    }

    #[test]
    fn test_derivation_clamps_at_bounds() {
        let (_clock, cache) = cache();
        cache.set("marseille", 89.0);
        assert_eq!(cache.derive_next("marseille", &FixedRandom(0.99)), 90.0);

        cache.set("marseille", 26.0);
        assert_eq!(cache.derive_next("marseille", &FixedRandom(0.0)), 25.0);
    }

    #[test]
    fn test_expired_entry_triggers_fresh_draw() {
        let (clock, cache) = cache();
        cache.set("bordeaux", 88.0);
        clock.advance(Duration::minutes(45));
        let value = cache.derive_next("bordeaux", &FixedRandom(0.5));
        assert_eq!(value, 55.0);
    }

    #[test]
    fn test_out_of_range_ttl_never_expires() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
        ));
        let cache = FallbackCache::new(clock.clone(), Duration::minutes(1_000_000_000_000));

        assert_eq!(cache.get("paris"), None);
        cache.set("paris", 61.0);
        clock.advance(Duration::days(3650));
        assert_eq!(cache.purge_expired(), 0);
        assert_eq!(cache.derive_next("paris", &FixedRandom(0.5)), 61.0);
    }
}
