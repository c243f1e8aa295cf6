//! Invalidation Hook Engine
//!
//! A rule table mapping [`HookTrigger`]s to cache-key patterns. Raising a
//! trigger runs its rules in registration order, resolving `{name}`
//! placeholders from the trigger context and handing each pattern to the
//! cache's [`CacheBackend::invalidate_pattern`].

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::{CacheBackend, StatsReport};
use crate::hooks::{HookTrigger, TriggerContext};

pub type ConditionFuture = BoxFuture<'static, bool>;

// == Rule Condition ==
/// Guard evaluated before a rule runs; `false` skips the rule.
#[derive(Clone)]
pub enum RuleCondition {
    Sync(Arc<dyn Fn() -> bool + Send + Sync>),
    Async(Arc<dyn Fn() -> ConditionFuture + Send + Sync>),
}

impl RuleCondition {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        RuleCondition::Sync(Arc::new(f))
    }

    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        RuleCondition::Async(Arc::new(move || f().boxed()))
    }

    async fn evaluate(&self) -> bool {
        match self {
            RuleCondition::Sync(f) => f(),
            RuleCondition::Async(f) => f().await,
        }
    }
}

impl fmt::Debug for RuleCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleCondition::Sync(_) => f.write_str("RuleCondition::Sync"),
            RuleCondition::Async(_) => f.write_str("RuleCondition::Async"),
        }
    }
}

// == Invalidation Rule ==
#[derive(Debug, Clone)]
pub struct InvalidationRule {
    pub name: String,
    pub patterns: Vec<String>,
    pub condition: Option<RuleCondition>,
}

impl InvalidationRule {
    pub fn new<I, S>(name: impl Into<String>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: RuleCondition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Replaces every `{name}` in `pattern` with the matching context value.
/// Placeholders without a context value are left as written.
pub fn resolve_pattern(pattern: &str, context: &TriggerContext) -> String {
    context
        .iter()
        .fold(pattern.to_string(), |resolved, (name, value)| {
            resolved.replace(&format!("{{{}}}", name), value)
        })
}

fn single_context(name: &str, value: &str) -> TriggerContext {
    TriggerContext::from([(name.to_string(), value.to_string())])
}

// == Invalidation Hooks ==
/// Rules are registered with `&mut self` during setup. Triggers only need
/// `&self`, so a configured engine is shared behind an `Arc`.
pub struct InvalidationHooks<C> {
    cache: Arc<RwLock<C>>,
    rules: HashMap<HookTrigger, Vec<InvalidationRule>>,
}

impl<C: CacheBackend> InvalidationHooks<C> {
    /// An engine with an empty rule table.
    pub fn new(cache: Arc<RwLock<C>>) -> Self {
        Self {
            cache,
            rules: HashMap::new(),
        }
    }

    /// An engine with every standard rule registered.
    pub fn standard(cache: Arc<RwLock<C>>) -> Self {
        let mut hooks = Self::new(cache);
        hooks.register_standard_hooks();
        hooks
    }

    pub fn cache(&self) -> &Arc<RwLock<C>> {
        &self.cache
    }

    pub fn register_rule(&mut self, trigger: HookTrigger, rule: InvalidationRule) {
        debug!(trigger = %trigger, rule = %rule.name, "Registered invalidation rule");
        self.rules.entry(trigger).or_default().push(rule);
    }

    // == Standard Rules ==
    pub fn register_plugin_install_hook(&mut self) {
        self.register_rule(
            HookTrigger::PluginInstall,
            InvalidationRule::new(
                "Invalidate plugin lists on install",
                ["plugins:available", "plugins:installed:*", "plugins:enabled:*"],
            ),
        );
        self.register_rule(
            HookTrigger::PluginEnable,
            InvalidationRule::new(
                "Invalidate enabled plugins on enable",
                ["plugins:enabled:*", "plugins:available"],
            ),
        );
    }

    pub fn register_plugin_uninstall_hook(&mut self) {
        self.register_rule(
            HookTrigger::PluginUninstall,
            InvalidationRule::new(
                "Invalidate all plugin data on uninstall",
                ["plugins:*", "settings:*"],
            ),
        );
        self.register_rule(
            HookTrigger::PluginDisable,
            InvalidationRule::new(
                "Invalidate enabled plugins on disable",
                ["plugins:enabled:*", "plugins:available"],
            ),
        );
    }

    pub fn register_settings_change_hook(&mut self) {
        self.register_rule(
            HookTrigger::SettingsChange,
            InvalidationRule::new("Invalidate everything on settings change", ["*"]),
        );
    }

    pub fn register_marketplace_refresh_hook(&mut self) {
        self.register_rule(
            HookTrigger::MarketplaceRefresh,
            InvalidationRule::new(
                "Invalidate marketplace data on refresh",
                ["marketplace:*", "plugins:available"],
            ),
        );
        self.register_rule(
            HookTrigger::MarketplaceAdd,
            InvalidationRule::new(
                "Invalidate marketplace list on add",
                ["marketplace:list", "marketplace:configured", "plugins:available"],
            ),
        );
        self.register_rule(
            HookTrigger::MarketplaceRemove,
            InvalidationRule::new(
                "Invalidate marketplace data on remove",
                ["marketplace:*", "plugins:available"],
            ),
        );
    }

    pub fn register_standard_hooks(&mut self) {
        self.register_plugin_install_hook();
        self.register_plugin_uninstall_hook();
        self.register_settings_change_hook();
        self.register_marketplace_refresh_hook();
    }

    // == Triggering ==
    /// Runs every rule registered for `trigger`. Returns the number of cache
    /// entries removed.
    ///
    /// Conditions are evaluated before the cache lock is taken, so a slow
    /// async condition never blocks other cache users.
    pub async fn trigger(&self, trigger: HookTrigger, context: &TriggerContext) -> usize {
        let Some(rules) = self.rules.get(&trigger) else {
            debug!(trigger = %trigger, "No invalidation rules registered");
            return 0;
        };

        let mut removed = 0;
        for rule in rules {
            if let Some(condition) = &rule.condition {
                if !condition.evaluate().await {
                    debug!(trigger = %trigger, rule = %rule.name, "Rule condition not met");
                    continue;
                }
            }

            let mut cache = self.cache.write().await;
            for pattern in &rule.patterns {
                let resolved = resolve_pattern(pattern, context);
                let count = cache.invalidate_pattern(&resolved);
                debug!(rule = %rule.name, pattern = %resolved, removed = count, "Applied invalidation pattern");
                removed += count;
            }
        }

        info!(trigger = %trigger, rules = rules.len(), removed, "Cache invalidation triggered");
        removed
    }

    /// Applies one pattern directly, bypassing the rule table.
    pub async fn invalidate_pattern(&self, pattern: &str) -> usize {
        self.cache.write().await.invalidate_pattern(pattern)
    }

    pub async fn on_plugin_installed(&self, plugin_id: &str) -> usize {
        self.trigger(HookTrigger::PluginInstall, &single_context("pluginId", plugin_id))
            .await
    }

    pub async fn on_plugin_uninstalled(&self, plugin_id: &str) -> usize {
        self.trigger(HookTrigger::PluginUninstall, &single_context("pluginId", plugin_id))
            .await
    }

    pub async fn on_plugin_enabled(&self, plugin_id: &str) -> usize {
        self.trigger(HookTrigger::PluginEnable, &single_context("pluginId", plugin_id))
            .await
    }

    pub async fn on_plugin_disabled(&self, plugin_id: &str) -> usize {
        self.trigger(HookTrigger::PluginDisable, &single_context("pluginId", plugin_id))
            .await
    }

    pub async fn on_settings_changed(&self) -> usize {
        self.trigger(HookTrigger::SettingsChange, &TriggerContext::new())
            .await
    }

    pub async fn on_marketplace_refreshed(&self, marketplace: Option<&str>) -> usize {
        let context = marketplace
            .map(|name| single_context("marketplace", name))
            .unwrap_or_default();
        self.trigger(HookTrigger::MarketplaceRefresh, &context).await
    }

    pub async fn on_marketplace_added(&self, marketplace: &str) -> usize {
        self.trigger(HookTrigger::MarketplaceAdd, &single_context("marketplace", marketplace))
            .await
    }

    pub async fn on_marketplace_removed(&self, marketplace: &str) -> usize {
        self.trigger(HookTrigger::MarketplaceRemove, &single_context("marketplace", marketplace))
            .await
    }

    // == Introspection ==
    pub fn rules(&self, trigger: HookTrigger) -> &[InvalidationRule] {
        self.rules.get(&trigger).map(Vec::as_slice).unwrap_or_default()
    }

    /// Rule names per trigger, for diagnostics.
    pub fn rule_names(&self) -> Vec<(HookTrigger, Vec<String>)> {
        let mut names: Vec<_> = self
            .rules
            .iter()
            .map(|(trigger, rules)| (*trigger, rules.iter().map(|r| r.name.clone()).collect()))
            .collect();
        names.sort_by_key(|(trigger, _)| *trigger);
        names
    }

    pub fn clear_rules(&mut self) {
        self.rules.clear();
    }

    pub async fn stats(&self) -> StatsReport {
        self.cache.read().await.stats_report()
    }
}
