//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking, TTL
//! expiration and invalidation hooks.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::notify::HookRegistry;
use crate::cache::stats::Counters;
use crate::cache::{CacheEntry, CacheStats, HookId, InvalidationHook, KeyPattern, LruTracker};
use crate::error::{CacheError, Result};

/// Default capacity when none is configured.
pub const DEFAULT_MAX_SIZE: usize = 1000;

// == Cache Options ==
/// Construction parameters shared by a cache and all namespaces built from it.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheOptions {
    /// Maximum number of entries before LRU eviction
    pub max_size: usize,
    /// Default TTL; None means entries never expire unless `set` overrides
    pub ttl: Option<Duration>,
    /// Whether hit/miss/eviction/expiration counters are maintained
    pub enable_stats: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            ttl: None,
            enable_stats: true,
        }
    }
}

impl CacheOptions {
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(CacheError::InvalidConfig(
                "max_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// == Cache Store ==
/// Bounded key-value store with LRU eviction and optional per-entry TTL.
///
/// Not internally synchronized; share it behind a lock when needed.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker,
    counters: Counters,
    hooks: HookRegistry,
    options: CacheOptions,
}

impl<V> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore, rejecting invalid options up front.
    pub fn new(options: CacheOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::from_validated(options))
    }

    pub(crate) fn from_validated(options: CacheOptions) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            counters: Counters::default(),
            hooks: HookRegistry::default(),
            options,
        }
    }

    // == Set ==
    /// Stores a key-value pair.
    ///
    /// The effective TTL is `ttl`, else the cache default, else none. A zero
    /// TTL means no expiration. Overwriting an existing key never evicts;
    /// inserting a new key into a full cache first evicts the least recently
    /// used entry.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let ttl = ttl.or(self.options.ttl).filter(|ttl| !ttl.is_zero());
        let entry = CacheEntry::new(value, ttl);

        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = entry;
            self.lru.touch(&key);
            return;
        }

        if self.entries.len() >= self.options.max_size {
            if let Some(evicted) = self.lru.evict_oldest() {
                self.entries.remove(&evicted);
                self.record(|c| c.evictions += 1);
                debug!(key = %evicted, "Evicted least recently used entry");
            }
        }

        self.lru.touch(&key);
        self.entries.insert(key, entry);
    }

    // == Has ==
    /// Checks for a live entry without touching recency or hit/miss counters.
    ///
    /// An expired entry is removed and counted as an expiration.
    pub fn has(&mut self, key: &str) -> bool {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => return false,
        };

        if expired {
            self.remove_entry(key);
            self.record(|c| c.expirations += 1);
            return false;
        }
        true
    }

    // == Delete ==
    /// Removes an entry by key. Returns true if it existed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key)
    }

    // == Invalidate ==
    /// Removes every entry whose key matches `pattern` and returns how many
    /// were removed. Hooks fire once per removed key.
    pub fn invalidate(&mut self, pattern: &str) -> usize {
        let pattern = KeyPattern::new(pattern);
        let matched: Vec<String> = self
            .lru
            .iter()
            .filter(|key| pattern.matches(key))
            .map(str::to_string)
            .collect();

        for key in &matched {
            self.hooks.notify(key);
            self.remove_entry(key);
        }

        if !matched.is_empty() {
            debug!(pattern = pattern.as_str(), removed = matched.len(), "Invalidated cache entries");
        }
        matched.len()
    }

    // == Clear ==
    /// Notifies hooks for every key, then empties the store.
    pub fn clear(&mut self) {
        for key in self.lru.iter() {
            self.hooks.notify(key);
        }
        self.entries.clear();
        self.lru.clear();
    }

    // == Cleanup Expired ==
    /// Removes all expired entries regardless of access and returns the count.
    pub fn cleanup(&mut self) -> usize {
        let now = current_timestamp_ms();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.hooks.notify(key);
            self.remove_entry(key);
        }

        let count = expired.len();
        self.record(|c| c.expirations += count as u64);
        count
    }

    // == Keys ==
    /// Live keys, least recently used first. Does not mutate the cache.
    pub fn keys(&self) -> Vec<String> {
        let now = current_timestamp_ms();
        self.lru
            .iter()
            .filter(|key| self.is_live(key, now))
            .map(str::to_string)
            .collect()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats::snapshot(self.counters, self.entries.len(), self.options.max_size)
    }

    /// Zeroes hit, miss, eviction and expiration counters.
    pub fn reset_stats(&mut self) {
        self.counters = Counters::default();
    }

    // == Hooks ==
    /// Registers a hook; pass the returned id to `remove_hook` to unregister.
    pub fn on_invalidate(&mut self, hook: InvalidationHook) -> HookId {
        self.hooks.register(hook)
    }

    pub fn remove_hook(&mut self, id: HookId) -> bool {
        self.hooks.unregister(id)
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    // == Length ==
    /// Returns the number of stored entries, including expired ones not yet
    /// swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Alias of [`len`](Self::len), matching [`NamespacedCache::size`].
    ///
    /// [`NamespacedCache::size`]: super::NamespacedCache::size
    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    fn is_live(&self, key: &str, now: u64) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired_at(now))
            .unwrap_or(false)
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.lru.remove(key);
            true
        } else {
            false
        }
    }

    fn record(&mut self, update: impl FnOnce(&mut Counters)) {
        if self.options.enable_stats {
            update(&mut self.counters);
        }
    }
}

impl<V: Clone> CacheStore<V> {
    // == Get ==
    /// Retrieves a value by key.
    ///
    /// A hit moves the key to the most recent position. Expired entries are
    /// removed and counted as both a miss and an expiration.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = current_timestamp_ms();
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                self.record(|c| c.misses += 1);
                return None;
            }
        };

        if expired {
            self.remove_entry(key);
            self.record(|c| {
                c.misses += 1;
                c.expirations += 1;
            });
            return None;
        }

        self.lru.touch(key);
        self.record(|c| c.hits += 1);
        let entry = self.entries.get_mut(key)?;
        entry.touch(now);
        Some(entry.value.clone())
    }

    // == Entries ==
    /// Live `(key, value)` pairs, least recently used first.
    pub fn entries(&self) -> Vec<(String, V)> {
        let now = current_timestamp_ms();
        self.lru
            .iter()
            .filter_map(|key| {
                self.entries
                    .get(key)
                    .filter(|entry| !entry.is_expired_at(now))
                    .map(|entry| (key.to_string(), entry.value.clone()))
            })
            .collect()
    }
}
