//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions and
//! expirations.

use serde::Serialize;

// == Counters ==
/// Monotonic counters owned by a single cache. Only reset on request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Counters {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

// == Cache Stats ==
/// Point-in-time snapshot of a cache's metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of lookups that returned a value
    pub hits: u64,
    /// Number of lookups that found nothing (absent or expired)
    pub misses: u64,
    /// Number of entries evicted due to LRU policy
    pub evictions: u64,
    /// Number of entries removed because their TTL elapsed
    pub expirations: u64,
    /// Current number of entries in the cache
    pub size: usize,
    /// Maximum allowed entries
    pub max_size: usize,
    /// hits / (hits + misses), 0.0 with no lookups
    pub hit_rate: f64,
}

impl CacheStats {
    pub(crate) fn snapshot(counters: Counters, size: usize, max_size: usize) -> Self {
        Self {
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions,
            expirations: counters.expirations,
            size,
            max_size,
            hit_rate: hit_rate(counters.hits, counters.misses),
        }
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.hits, self.misses)
    }
}

fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}
