//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{CacheOptions, DEFAULT_MAX_SIZE};
use crate::lock::LockOptions;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Maximum number of entries per cache namespace
    pub max_entries: usize,
    /// Default TTL in milliseconds for entries without explicit TTL; None never expires
    pub default_ttl_ms: Option<u64>,
    /// Whether hit/miss/eviction counters are maintained
    pub enable_stats: bool,
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// How long a writer waits for a config file lock
    pub lock_timeout_ms: u64,
    /// Delay between lock acquisition attempts
    pub lock_retry_ms: u64,
    /// Age after which a contended lock is treated as abandoned; None disables
    pub lock_stale_after_secs: Option<u64>,
    /// Directory that relative config file names resolve against
    pub settings_root: PathBuf,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env_opt(name).unwrap_or(default)
}

fn env_opt<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum entries per namespace (default: 1000)
    /// - `DEFAULT_TTL_MS` - Default TTL in milliseconds (default: unset, no expiry)
    /// - `ENABLE_STATS` - Maintain statistics counters (default: true)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    /// - `LOCK_TIMEOUT_MS` - File lock acquisition budget (default: 10000)
    /// - `LOCK_RETRY_MS` - File lock retry interval (default: 100)
    /// - `LOCK_STALE_AFTER_SECS` - Stale lock threshold (default: unset)
    /// - `SETTINGS_ROOT` - Base directory for config files (default: `.`)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            default_ttl_ms: env_opt("DEFAULT_TTL_MS"),
            enable_stats: env_or("ENABLE_STATS", defaults.enable_stats),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            lock_timeout_ms: env_or("LOCK_TIMEOUT_MS", defaults.lock_timeout_ms),
            lock_retry_ms: env_or("LOCK_RETRY_MS", defaults.lock_retry_ms),
            lock_stale_after_secs: env_opt("LOCK_STALE_AFTER_SECS"),
            settings_root: env::var_os("SETTINGS_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.settings_root),
        }
    }

    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            max_size: self.max_entries,
            ttl: self.default_ttl_ms.map(Duration::from_millis),
            enable_stats: self.enable_stats,
        }
    }

    pub fn lock_options(&self) -> LockOptions {
        LockOptions {
            timeout: Duration::from_millis(self.lock_timeout_ms),
            retry_interval: Duration::from_millis(self.lock_retry_ms),
            stale_after: self.lock_stale_after_secs.map(Duration::from_secs),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_SIZE,
            default_ttl_ms: None,
            enable_stats: true,
            server_port: 3000,
            cleanup_interval: 1,
            lock_timeout_ms: 10_000,
            lock_retry_ms: 100,
            lock_stale_after_secs: None,
            settings_root: PathBuf::from("."),
        }
    }
}
