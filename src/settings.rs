//! Config File Store
//!
//! Cached JSON config files with locked writes. A write takes the file lock,
//! replaces the file, drops the cached copy, then raises a domain event so
//! dependent cache entries are invalidated too.
//!
//! Reads load without the lock. Each write bumps a per-path generation while
//! holding the cache write guard, and a read only caches what it loaded if the
//! generation it saw before loading is still current.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::cache::NamespacedCache;
use crate::error::SettingsError;
use crate::hooks::{HookTrigger, InvalidationHooks, TriggerContext};
use crate::lock::{with_file_lock_opts, LockOptions};

/// Cache namespace holding parsed config files.
pub const SETTINGS_NAMESPACE: &str = "settings";

pub type SharedCache = Arc<RwLock<NamespacedCache<Value>>>;
pub type SharedHooks = Arc<InvalidationHooks<NamespacedCache<Value>>>;

fn cache_key(path: &Path) -> String {
    format!("file:{}", path.display())
}

// == Config File Store ==
#[derive(Clone)]
pub struct ConfigFileStore {
    cache: SharedCache,
    hooks: SharedHooks,
    lock_options: LockOptions,
    generations: Arc<Mutex<HashMap<PathBuf, u64>>>,
}

impl ConfigFileStore {
    pub fn new(cache: SharedCache, hooks: SharedHooks, lock_options: LockOptions) -> Self {
        Self {
            cache,
            hooks,
            lock_options,
            generations: Arc::default(),
        }
    }

    /// Reads a config file through the cache. A missing file reads as `{}`,
    /// and so does an unparsable one (with a warning).
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Value, SettingsError> {
        let path = path.as_ref();
        let key = cache_key(path);

        if let Some(value) = self.cache.write().await.get(SETTINGS_NAMESPACE, &key) {
            return Ok(value);
        }

        let seen = self.generation(path).await;
        let value = match load_json(path).await {
            Ok(value) => value.unwrap_or_else(empty_object),
            Err(SettingsError::Json(e)) => {
                warn!(path = %path.display(), error = %e, "Ignoring unparsable config file");
                empty_object()
            }
            Err(e) => return Err(e),
        };

        let mut cache = self.cache.write().await;
        if self.generation(path).await == seen {
            cache.set(SETTINGS_NAMESPACE, key, value.clone(), None);
        } else {
            debug!(path = %path.display(), "Config file rewritten during read, not caching");
        }
        Ok(value)
    }

    /// Replaces a config file and raises `settings:change`.
    pub async fn write(&self, path: impl AsRef<Path>, value: &Value) -> Result<(), SettingsError> {
        self.write_with_event(path, value, HookTrigger::SettingsChange, &TriggerContext::new())
            .await
    }

    /// Replaces a config file and raises `trigger` with `context`.
    pub async fn write_with_event(
        &self,
        path: impl AsRef<Path>,
        value: &Value,
        trigger: HookTrigger,
        context: &TriggerContext,
    ) -> Result<(), SettingsError> {
        let path = path.as_ref();
        with_file_lock_opts(path, &self.lock_options, || save_json(path, value)).await?;
        self.after_write(path, trigger, context).await;
        Ok(())
    }

    /// Locked read-modify-write against the file on disk, bypassing the
    /// cache. Unlike [`read`](Self::read), an unparsable file is an error
    /// here so its contents are never silently replaced.
    pub async fn update<F>(&self, path: impl AsRef<Path>, modify: F) -> Result<Value, SettingsError>
    where
        F: FnOnce(&mut Value),
    {
        let path = path.as_ref();
        let updated = with_file_lock_opts(path, &self.lock_options, || async move {
            let mut value = load_json(path).await?.unwrap_or_else(empty_object);
            modify(&mut value);
            save_json(path, &value).await?;
            Ok::<_, SettingsError>(value)
        })
        .await?;

        self.after_write(path, HookTrigger::SettingsChange, &TriggerContext::new())
            .await;
        Ok(updated)
    }

    async fn generation(&self, path: &Path) -> u64 {
        self.generations
            .lock()
            .await
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    async fn after_write(&self, path: &Path, trigger: HookTrigger, context: &TriggerContext) {
        {
            let mut cache = self.cache.write().await;
            *self
                .generations
                .lock()
                .await
                .entry(path.to_path_buf())
                .or_insert(0) += 1;
            cache.delete(SETTINGS_NAMESPACE, &cache_key(path));
        }
        self.hooks.trigger(trigger, context).await;
    }
}

fn empty_object() -> Value {
    json!({})
}

/// `Ok(None)` when the file does not exist.
async fn load_json(path: &Path) -> Result<Option<Value>, SettingsError> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SettingsError::io(path, e)),
    }
}

/// Writes pretty JSON through a sibling temp file and a rename, so readers
/// that skip the lock never see a half-written file.
async fn save_json(path: &Path, value: &Value) -> Result<(), SettingsError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| SettingsError::io(dir, e))?;
    }

    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');

    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, content)
        .await
        .map_err(|e| SettingsError::io(&tmp_path, e))?;
    fs::rename(&tmp_path, path)
        .await
        .map_err(|e| SettingsError::io(path, e))?;

    debug!(path = %path.display(), "Wrote config file");
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
