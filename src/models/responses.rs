//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;
use crate::hooks::HookTrigger;
use crate::lock::LockInfo;

/// Response body for GET /cache/:namespace/:key
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub namespace: String,
    pub key: String,
    pub value: Value,
}

impl GetResponse {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
            value,
        }
    }
}

/// Response body for PUT /cache/:namespace
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    pub namespace: String,
    pub key: String,
}

impl SetResponse {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let key = key.into();
        Self {
            message: format!("Key '{}' set in namespace '{}'", key, namespace),
            namespace,
            key,
        }
    }
}

/// Response body for DELETE /cache/:namespace/:key
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    pub namespace: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted from namespace '{}'", key, namespace),
            namespace,
            key,
        }
    }
}

/// Response body for pattern and namespace invalidation
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub namespace: String,
    pub pattern: String,
    /// Number of entries removed
    pub removed: usize,
}

impl InvalidateResponse {
    pub fn new(namespace: impl Into<String>, pattern: impl Into<String>, removed: usize) -> Self {
        Self {
            namespace: namespace.into(),
            pattern: pattern.into(),
            removed,
        }
    }
}

/// Response body for GET /namespaces
#[derive(Debug, Clone, Serialize)]
pub struct NamespacesResponse {
    pub namespaces: Vec<String>,
}

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Entries across all namespaces
    pub total_entries: usize,
    pub namespaces: BTreeMap<String, CacheStats>,
}

impl StatsResponse {
    pub fn new(namespaces: BTreeMap<String, CacheStats>) -> Self {
        Self {
            total_entries: namespaces.values().map(|s| s.size).sum(),
            namespaces,
        }
    }
}

/// Response body for POST /events/:trigger
#[derive(Debug, Clone, Serialize)]
pub struct TriggerResponse {
    pub trigger: HookTrigger,
    /// Number of entries removed by the trigger's rules
    pub removed: usize,
}

/// Response body for config file writes and lock removal
#[derive(Debug, Clone, Serialize)]
pub struct FileResponse {
    pub message: String,
    pub path: String,
}

impl FileResponse {
    pub fn new(message: impl Into<String>, path: &Path) -> Self {
        Self {
            message: message.into(),
            path: path.display().to_string(),
        }
    }
}

/// Response body for GET /locks/*name
#[derive(Debug, Clone, Serialize)]
pub struct LockStatusResponse {
    pub path: String,
    pub locked: bool,
    /// Owner of the lock when the sidecar is readable
    pub info: Option<LockInfo>,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
