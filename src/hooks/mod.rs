//! Hooks Module
//!
//! Event-driven cache invalidation: named domain events mapped to the
//! cache-key patterns they make stale.

mod engine;
mod invalidator;
mod trigger;

pub use engine::{
    resolve_pattern, ConditionFuture, InvalidationHooks, InvalidationRule, RuleCondition,
};
pub use invalidator::{PluginCacheInvalidator, ScopedInvalidator};
pub use trigger::{HookTrigger, TriggerContext};
