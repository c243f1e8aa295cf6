//! Cache Module
//!
//! Provides in-memory caching with TTL expiration, LRU eviction, pattern
//! invalidation and per-namespace partitioning.

mod entry;
mod lru;
mod namespaced;
mod notify;
mod pattern;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

use std::collections::BTreeMap;

use serde::Serialize;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use lru::LruTracker;
pub use namespaced::NamespacedCache;
pub use notify::{HookFuture, HookId, InvalidationHook};
pub use pattern::KeyPattern;
pub use stats::CacheStats;
pub use store::{CacheOptions, CacheStore, DEFAULT_MAX_SIZE};

// == Stats Report ==
/// Statistics of whatever cache sits behind a [`CacheBackend`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StatsReport {
    Single(CacheStats),
    Namespaced(BTreeMap<String, CacheStats>),
}

// == Cache Backend ==
/// The surface the invalidation engine and the cleanup task need from a cache.
pub trait CacheBackend: Send + Sync + 'static {
    /// Applies a resolved invalidation pattern and returns the number of
    /// entries removed.
    fn invalidate_pattern(&mut self, pattern: &str) -> usize;

    /// Removes expired entries and returns the number removed.
    fn cleanup_expired(&mut self) -> usize;

    fn stats_report(&self) -> StatsReport;
}

impl<V: Send + Sync + 'static> CacheBackend for CacheStore<V> {
    fn invalidate_pattern(&mut self, pattern: &str) -> usize {
        self.invalidate(pattern)
    }

    fn cleanup_expired(&mut self) -> usize {
        self.cleanup()
    }

    fn stats_report(&self) -> StatsReport {
        StatsReport::Single(self.stats())
    }
}

/// Namespaced patterns: `*` clears every namespace, `ns:rest` invalidates
/// `rest` inside `ns` (split at the first colon), and a bare `ns` destroys
/// that namespace.
impl<V: Send + Sync + 'static> CacheBackend for NamespacedCache<V> {
    fn invalidate_pattern(&mut self, pattern: &str) -> usize {
        if pattern == "*" {
            return self.clear();
        }

        match pattern.split_once(':') {
            Some((namespace, key_pattern)) => self.invalidate(namespace, key_pattern),
            None => self.invalidate_namespace(pattern),
        }
    }

    fn cleanup_expired(&mut self) -> usize {
        self.cleanup()
    }

    fn stats_report(&self) -> StatsReport {
        StatsReport::Namespaced(self.all_stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_backend_pattern_routing() {
        let mut cache: NamespacedCache<u32> =
            NamespacedCache::new(CacheOptions::default()).unwrap();
        cache.set("plugins", "installed:user", 1, None);
        cache.set("plugins", "available", 2, None);
        cache.set("marketplace", "mag:data", 3, None);
        cache.set("settings", "file:a", 4, None);

        // Only the first colon separates the namespace
        assert_eq!(cache.invalidate_pattern("plugins:installed:*"), 1);
        assert!(cache.has("plugins", "available"));

        assert_eq!(cache.invalidate_pattern("marketplace"), 1);
        assert!(!cache.namespaces().contains(&"marketplace".to_string()));

        assert_eq!(cache.invalidate_pattern("*"), 2);
        assert!(cache.namespaces().is_empty());
    }

    #[test]
    fn test_single_backend_uses_plain_patterns() {
        let mut cache: CacheStore<u32> = CacheStore::new(CacheOptions::default()).unwrap();
        cache.set("plugins:available", 1, None);
        cache.set("marketplace:mag", 2, None);

        assert_eq!(cache.invalidate_pattern("plugins:*"), 1);
        assert!(matches!(cache.stats_report(), StatsReport::Single(s) if s.size == 1));
    }
}
