//! Namespaced Cache Module
//!
//! Routes `(namespace, key)` operations to independent [`CacheStore`]s that
//! are created on first touch and share one set of [`CacheOptions`].

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheOptions, CacheStats, CacheStore, HookId, InvalidationHook};
use crate::error::Result;

// == Namespaced Cache ==
#[derive(Debug)]
pub struct NamespacedCache<V> {
    caches: BTreeMap<String, CacheStore<V>>,
    options: CacheOptions,
}

impl<V> NamespacedCache<V> {
    /// Validates the shared options once; namespaces created later reuse them.
    pub fn new(options: CacheOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            caches: BTreeMap::new(),
            options,
        })
    }

    fn cache_mut(&mut self, namespace: &str) -> &mut CacheStore<V> {
        let options = &self.options;
        self.caches
            .entry(namespace.to_string())
            .or_insert_with(|| CacheStore::from_validated(options.clone()))
    }

    pub fn set(&mut self, namespace: &str, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        self.cache_mut(namespace).set(key, value, ttl);
    }

    pub fn has(&mut self, namespace: &str, key: &str) -> bool {
        self.cache_mut(namespace).has(key)
    }

    pub fn delete(&mut self, namespace: &str, key: &str) -> bool {
        self.cache_mut(namespace).delete(key)
    }

    /// Pattern invalidation scoped to one namespace.
    pub fn invalidate(&mut self, namespace: &str, pattern: &str) -> usize {
        self.cache_mut(namespace).invalidate(pattern)
    }

    /// Destroys a namespace, firing its hooks for every key first. Its stats
    /// and hooks are discarded; the next access starts from scratch.
    ///
    /// Returns the number of entries dropped.
    pub fn invalidate_namespace(&mut self, namespace: &str) -> usize {
        match self.caches.remove(namespace) {
            Some(mut cache) => {
                let dropped = cache.len();
                cache.clear();
                debug!(namespace, dropped, "Invalidated cache namespace");
                dropped
            }
            None => 0,
        }
    }

    /// Destroys every namespace. Returns the number of entries dropped.
    pub fn clear(&mut self) -> usize {
        let caches = std::mem::take(&mut self.caches);
        caches
            .into_values()
            .map(|mut cache| {
                let dropped = cache.len();
                cache.clear();
                dropped
            })
            .sum()
    }

    /// Sweeps expired entries in every namespace.
    pub fn cleanup(&mut self) -> usize {
        self.caches.values_mut().map(CacheStore::cleanup).sum()
    }

    pub fn stats(&self, namespace: &str) -> Option<CacheStats> {
        self.caches.get(namespace).map(CacheStore::stats)
    }

    pub fn all_stats(&self) -> BTreeMap<String, CacheStats> {
        self.caches
            .iter()
            .map(|(namespace, cache)| (namespace.clone(), cache.stats()))
            .collect()
    }

    pub fn on_invalidate(&mut self, namespace: &str, hook: InvalidationHook) -> HookId {
        self.cache_mut(namespace).on_invalidate(hook)
    }

    pub fn remove_hook(&mut self, namespace: &str, id: HookId) -> bool {
        self.caches
            .get_mut(namespace)
            .map(|cache| cache.remove_hook(id))
            .unwrap_or(false)
    }

    /// Instantiated namespaces, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        self.caches.keys().cloned().collect()
    }

    /// Live keys of one namespace without creating it.
    pub fn keys(&self, namespace: &str) -> Vec<String> {
        self.caches
            .get(namespace)
            .map(CacheStore::keys)
            .unwrap_or_default()
    }

    /// Total entries across all namespaces.
    pub fn size(&self) -> usize {
        self.caches.values().map(CacheStore::len).sum()
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }
}

impl<V: Clone> NamespacedCache<V> {
    pub fn get(&mut self, namespace: &str, key: &str) -> Option<V> {
        self.cache_mut(namespace).get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn cache(max_size: usize) -> NamespacedCache<String> {
        NamespacedCache::new(CacheOptions::with_max_size(max_size)).unwrap()
    }

    #[test]
    fn test_namespaces_are_independent() {
        let mut cache = cache(2);

        cache.set("plugins", "a", "1".to_string(), None);
        cache.set("plugins", "b", "2".to_string(), None);
        cache.set("marketplace", "a", "3".to_string(), None);
        cache.set("plugins", "c", "4".to_string(), None);

        // Capacity is per namespace
        assert_eq!(cache.get("plugins", "a"), None);
        assert_eq!(cache.get("marketplace", "a").as_deref(), Some("3"));
        assert_eq!(cache.size(), 3);

        let plugins = cache.stats("plugins").unwrap();
        assert_eq!(plugins.evictions, 1);
        assert_eq!(plugins.misses, 1);
        let marketplace = cache.stats("marketplace").unwrap();
        assert_eq!(marketplace.hits, 1);
        assert_eq!(marketplace.evictions, 0);
    }

    #[test]
    fn test_namespaces_created_lazily() {
        let mut cache = cache(10);
        assert!(cache.namespaces().is_empty());
        assert!(cache.stats("plugins").is_none());
        assert!(cache.keys("plugins").is_empty());
        assert!(cache.namespaces().is_empty());

        cache.set("settings", "k", "v".to_string(), None);
        cache.get("plugins", "k");

        assert_eq!(cache.namespaces(), vec!["plugins", "settings"]);
    }

    #[test]
    fn test_invalidate_within_namespace() {
        let mut cache = cache(10);
        cache.set("plugins", "enabled:user", "a".to_string(), None);
        cache.set("plugins", "enabled:project", "b".to_string(), None);
        cache.set("plugins", "available", "c".to_string(), None);
        cache.set("settings", "enabled:user", "d".to_string(), None);

        assert_eq!(cache.invalidate("plugins", "enabled:*"), 2);
        assert_eq!(cache.keys("plugins"), vec!["available"]);
        assert!(cache.has("settings", "enabled:user"));
    }

    #[test]
    fn test_invalidate_namespace_resets_stats() {
        let mut cache = cache(10);
        cache.set("plugins", "a", "1".to_string(), None);
        cache.get("plugins", "a");

        assert_eq!(cache.invalidate_namespace("plugins"), 1);
        assert!(cache.stats("plugins").is_none());
        assert_eq!(cache.invalidate_namespace("plugins"), 0);

        assert_eq!(cache.get("plugins", "a"), None);
        let stats = cache.stats("plugins").unwrap();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_invalidate_namespace_fires_hooks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut cache = cache(10);
        let sink = seen.clone();
        cache.on_invalidate(
            "plugins",
            InvalidationHook::sync(move |key| {
                sink.lock().unwrap().push(key.to_string());
                Ok(())
            }),
        );
        cache.set("plugins", "a", "1".to_string(), None);
        cache.set("plugins", "b", "2".to_string(), None);

        cache.invalidate_namespace("plugins");

        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_clear_destroys_all_namespaces() {
        let mut cache = cache(10);
        cache.set("a", "k", "1".to_string(), None);
        cache.set("b", "k", "2".to_string(), None);
        cache.set("b", "j", "3".to_string(), None);

        assert_eq!(cache.clear(), 3);
        assert!(cache.namespaces().is_empty());
        assert_eq!(cache.size(), 0);
        assert!(cache.all_stats().is_empty());
    }

    #[test]
    fn test_cleanup_across_namespaces() {
        let mut cache = cache(10);
        cache.set("a", "k", "1".to_string(), Some(Duration::from_millis(20)));
        cache.set("b", "k", "2".to_string(), Some(Duration::from_millis(20)));
        cache.set("b", "keep", "3".to_string(), None);

        std::thread::sleep(Duration::from_millis(60));

        assert_eq!(cache.cleanup(), 2);
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.stats("b").unwrap().expirations, 1);
    }

    #[test]
    fn test_remove_hook_on_unknown_namespace() {
        let mut cache = cache(10);
        let id = cache.on_invalidate("a", InvalidationHook::sync(|_| Ok(())));
        assert!(!cache.remove_hook("b", id));
        assert!(cache.remove_hook("a", id));
    }
}
