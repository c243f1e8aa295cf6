//! Domain events that can drive cache invalidation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Values substituted into `{name}` placeholders of rule patterns.
pub type TriggerContext = BTreeMap<String, String>;

// == Hook Trigger ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HookTrigger {
    #[serde(rename = "plugin:install")]
    PluginInstall,
    #[serde(rename = "plugin:uninstall")]
    PluginUninstall,
    #[serde(rename = "plugin:enable")]
    PluginEnable,
    #[serde(rename = "plugin:disable")]
    PluginDisable,
    #[serde(rename = "settings:change")]
    SettingsChange,
    #[serde(rename = "marketplace:refresh")]
    MarketplaceRefresh,
    #[serde(rename = "marketplace:add")]
    MarketplaceAdd,
    #[serde(rename = "marketplace:remove")]
    MarketplaceRemove,
}

impl HookTrigger {
    pub const ALL: [HookTrigger; 8] = [
        HookTrigger::PluginInstall,
        HookTrigger::PluginUninstall,
        HookTrigger::PluginEnable,
        HookTrigger::PluginDisable,
        HookTrigger::SettingsChange,
        HookTrigger::MarketplaceRefresh,
        HookTrigger::MarketplaceAdd,
        HookTrigger::MarketplaceRemove,
    ];

    /// Wire name, e.g. `plugin:install`.
    pub fn as_str(&self) -> &'static str {
        match self {
            HookTrigger::PluginInstall => "plugin:install",
            HookTrigger::PluginUninstall => "plugin:uninstall",
            HookTrigger::PluginEnable => "plugin:enable",
            HookTrigger::PluginDisable => "plugin:disable",
            HookTrigger::SettingsChange => "settings:change",
            HookTrigger::MarketplaceRefresh => "marketplace:refresh",
            HookTrigger::MarketplaceAdd => "marketplace:add",
            HookTrigger::MarketplaceRemove => "marketplace:remove",
        }
    }
}

impl fmt::Display for HookTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookTrigger {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookTrigger::ALL
            .into_iter()
            .find(|trigger| trigger.as_str() == s)
            .ok_or_else(|| CacheError::InvalidRequest(format!("Unknown hook trigger: {}", s)))
    }
}
