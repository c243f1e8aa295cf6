//! API Handlers
//!
//! HTTP request handlers for each admin endpoint.

use std::path::{Component, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::info;

use crate::cache::NamespacedCache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::hooks::{HookTrigger, InvalidationHooks};
use crate::lock::{self, LockOptions};
use crate::models::{
    DeleteResponse, FileResponse, GetResponse, HealthResponse, InvalidateRequest,
    InvalidateResponse, LockStatusResponse, NamespacesResponse, SetRequest, SetResponse,
    StatsResponse, TriggerRequest, TriggerResponse,
};
use crate::settings::{ConfigFileStore, SharedCache, SharedHooks};

/// Application state shared across all handlers.
///
/// The cache, the invalidation engine and the config file store all point
/// at the same namespaced cache.
#[derive(Clone)]
pub struct AppState {
    pub cache: SharedCache,
    pub hooks: SharedHooks,
    pub settings: ConfigFileStore,
    /// Base directory for `/settings` and `/locks` names
    pub settings_root: PathBuf,
}

impl AppState {
    /// Wires a cache to the standard invalidation rules and a config store.
    pub fn new(
        cache: NamespacedCache<Value>,
        lock_options: LockOptions,
        settings_root: impl Into<PathBuf>,
    ) -> Self {
        let cache = Arc::new(RwLock::new(cache));
        let hooks = Arc::new(InvalidationHooks::standard(cache.clone()));
        let settings = ConfigFileStore::new(cache.clone(), hooks.clone(), lock_options);
        Self {
            cache,
            hooks,
            settings,
            settings_root: settings_root.into(),
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = NamespacedCache::new(config.cache_options())?;
        Ok(Self::new(
            cache,
            config.lock_options(),
            config.settings_root.clone(),
        ))
    }

    /// Resolves a client-supplied relative file name under the settings
    /// root. Absolute paths and `..` are rejected.
    pub fn resolve_settings_path(&self, name: &str) -> Result<PathBuf> {
        let relative = std::path::Path::new(name);
        let contained = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained {
            return Err(CacheError::InvalidRequest(format!(
                "Invalid config file name: {}",
                name
            )));
        }
        Ok(self.settings_root.join(relative))
    }
}

// == Cache Handlers ==

/// Handler for PUT /cache/:namespace
pub async fn set_handler(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = req.ttl_ms.map(Duration::from_millis);
    state
        .cache
        .write()
        .await
        .set(&namespace, req.key.clone(), req.value, ttl);

    Ok(Json(SetResponse::new(namespace, req.key)))
}

/// Handler for GET /cache/:namespace/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
) -> Result<Json<GetResponse>> {
    // Write lock: a hit updates recency and stats
    let value = state.cache.write().await.get(&namespace, &key);

    match value {
        Some(value) => Ok(Json(GetResponse::new(namespace, key, value))),
        None => Err(CacheError::NotFound(format!("{}:{}", namespace, key))),
    }
}

/// Handler for DELETE /cache/:namespace/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>> {
    if !state.cache.write().await.delete(&namespace, &key) {
        return Err(CacheError::NotFound(format!("{}:{}", namespace, key)));
    }

    Ok(Json(DeleteResponse::new(namespace, key)))
}

/// Handler for POST /cache/:namespace/invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let removed = state
        .cache
        .write()
        .await
        .invalidate(&namespace, &req.pattern);
    info!(namespace = %namespace, pattern = %req.pattern, removed, "Invalidated by pattern");

    Ok(Json(InvalidateResponse::new(namespace, req.pattern, removed)))
}

/// Handler for DELETE /cache/:namespace
pub async fn invalidate_namespace_handler(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Json<InvalidateResponse> {
    let removed = state.cache.write().await.invalidate_namespace(&namespace);
    info!(namespace = %namespace, removed, "Invalidated namespace");

    Json(InvalidateResponse::new(namespace, "*", removed))
}

/// Handler for GET /namespaces
pub async fn namespaces_handler(State(state): State<AppState>) -> Json<NamespacesResponse> {
    let namespaces = state.cache.read().await.namespaces();
    Json(NamespacesResponse { namespaces })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.read().await.all_stats();
    Json(StatsResponse::new(stats))
}

// == Event Handlers ==

/// Handler for POST /events/:trigger
///
/// The body is optional; without it the trigger runs with an empty context.
pub async fn trigger_handler(
    State(state): State<AppState>,
    Path(trigger): Path<String>,
    body: Option<Json<TriggerRequest>>,
) -> Result<Json<TriggerResponse>> {
    let trigger: HookTrigger = trigger.parse()?;
    let context = body.map(|Json(req)| req.into_context()).unwrap_or_default();

    let removed = state.hooks.trigger(trigger, &context).await;

    Ok(Json(TriggerResponse { trigger, removed }))
}

// == Settings Handlers ==

/// Handler for GET /settings/*name
pub async fn read_settings_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>> {
    let path = state.resolve_settings_path(&name)?;
    let value = state.settings.read(&path).await?;
    Ok(Json(value))
}

/// Handler for PUT /settings/*name
pub async fn write_settings_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(value): Json<Value>,
) -> Result<Json<FileResponse>> {
    let path = state.resolve_settings_path(&name)?;
    state.settings.write(&path, &value).await?;
    Ok(Json(FileResponse::new("Config file written", &path)))
}

// == Lock Handlers ==

/// Handler for GET /locks/*name
pub async fn lock_status_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<LockStatusResponse>> {
    let path = state.resolve_settings_path(&name)?;
    Ok(Json(LockStatusResponse {
        locked: lock::is_file_locked(&path),
        info: lock::get_lock_info(&path).await,
        path: path.display().to_string(),
    }))
}

/// Handler for DELETE /locks/*name
///
/// Manual recovery for a lock left behind by a crashed writer.
pub async fn force_unlock_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<FileResponse>> {
    let path = state.resolve_settings_path(&name)?;
    lock::force_remove_lock(&path).await?;
    Ok(Json(FileResponse::new("Lock removed", &path)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
