//! Convenience handles for invalidating plugin and namespace data without
//! naming triggers or writing patterns by hand.

use std::sync::Arc;

use crate::cache::CacheBackend;
use crate::hooks::InvalidationHooks;

// == Plugin Cache Invalidator ==
pub struct PluginCacheInvalidator<C> {
    hooks: Arc<InvalidationHooks<C>>,
}

impl<C> Clone for PluginCacheInvalidator<C> {
    fn clone(&self) -> Self {
        Self {
            hooks: self.hooks.clone(),
        }
    }
}

impl<C: CacheBackend> PluginCacheInvalidator<C> {
    pub fn new(hooks: Arc<InvalidationHooks<C>>) -> Self {
        Self { hooks }
    }

    /// Runs the uninstall rules for `plugin_id`.
    pub async fn invalidate_plugin(&self, plugin_id: &str) -> usize {
        self.hooks.on_plugin_uninstalled(plugin_id).await
    }

    /// Runs the marketplace-removal rules for `marketplace`.
    pub async fn invalidate_marketplace(&self, marketplace: &str) -> usize {
        self.hooks.on_marketplace_removed(marketplace).await
    }

    /// Runs the settings-change rules, which clear everything under the
    /// standard rule set.
    pub async fn invalidate_all(&self) -> usize {
        self.hooks.on_settings_changed().await
    }

    pub fn scoped(&self, namespace: impl Into<String>) -> ScopedInvalidator<C> {
        ScopedInvalidator {
            hooks: self.hooks.clone(),
            namespace: namespace.into(),
        }
    }
}

// == Scoped Invalidator ==
/// Prefixes every pattern with one namespace. Bypasses the rule table.
pub struct ScopedInvalidator<C> {
    hooks: Arc<InvalidationHooks<C>>,
    namespace: String,
}

impl<C: CacheBackend> ScopedInvalidator<C> {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub async fn invalidate(&self, pattern: &str) -> usize {
        self.hooks
            .invalidate_pattern(&format!("{}:{}", self.namespace, pattern))
            .await
    }

    pub async fn invalidate_all(&self) -> usize {
        self.hooks.invalidate_pattern(&self.namespace).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheOptions, NamespacedCache};
    use tokio::sync::RwLock;

    type Cache = NamespacedCache<String>;

    fn setup() -> (Arc<RwLock<Cache>>, PluginCacheInvalidator<Cache>) {
        let cache = Arc::new(RwLock::new(
            NamespacedCache::new(CacheOptions::with_max_size(100)).unwrap(),
        ));
        let hooks = Arc::new(InvalidationHooks::standard(cache.clone()));
        (cache, PluginCacheInvalidator::new(hooks))
    }

    async fn put(cache: &Arc<RwLock<Cache>>, namespace: &str, key: &str) {
        cache
            .write()
            .await
            .set(namespace, key, "value".to_string(), None);
    }

    #[tokio::test]
    async fn test_invalidate_plugin() {
        let (cache, invalidator) = setup();
        put(&cache, "plugins", "available").await;
        put(&cache, "plugins", "installed:user").await;
        put(&cache, "marketplace", "mag:data").await;

        invalidator.invalidate_plugin("frontend@mag").await;

        let mut c = cache.write().await;
        assert!(!c.has("plugins", "available"));
        assert!(!c.has("plugins", "installed:user"));
        assert!(c.has("marketplace", "mag:data"));
    }

    #[tokio::test]
    async fn test_invalidate_marketplace() {
        let (cache, invalidator) = setup();
        put(&cache, "marketplace", "mag:data").await;
        put(&cache, "plugins", "available").await;

        assert_eq!(invalidator.invalidate_marketplace("mag").await, 2);

        let mut c = cache.write().await;
        assert!(!c.has("marketplace", "mag:data"));
        assert!(!c.has("plugins", "available"));
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let (cache, invalidator) = setup();
        put(&cache, "plugins", "key1").await;
        put(&cache, "marketplace", "key2").await;
        put(&cache, "settings", "key3").await;

        assert_eq!(invalidator.invalidate_all().await, 3);
        assert_eq!(cache.read().await.size(), 0);
    }

    #[tokio::test]
    async fn test_scoped_invalidate() {
        let (cache, invalidator) = setup();
        put(&cache, "users", "user:123").await;
        put(&cache, "users", "user:456").await;
        put(&cache, "users", "profile").await;
        put(&cache, "posts", "post:789").await;

        let scoped = invalidator.scoped("users");
        assert_eq!(scoped.namespace(), "users");
        assert_eq!(scoped.invalidate("user:*").await, 2);

        let mut c = cache.write().await;
        assert!(!c.has("users", "user:123"));
        assert!(c.has("users", "profile"));
        assert!(c.has("posts", "post:789"));
    }

    #[tokio::test]
    async fn test_scoped_invalidate_all() {
        let (cache, invalidator) = setup();
        put(&cache, "users", "key1").await;
        put(&cache, "users", "key2").await;
        put(&cache, "posts", "key3").await;

        assert_eq!(invalidator.clone().scoped("users").invalidate_all().await, 2);

        let c = cache.read().await;
        assert_eq!(c.namespaces(), vec!["posts"]);
    }
}
