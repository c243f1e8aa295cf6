//! Error types for the shared-state subsystem
//!
//! Provides unified error handling using thiserror.

use std::path::PathBuf;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for cache construction and the admin API.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Rejected cache configuration (e.g. a zero capacity)
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),

    /// Key or namespace not found
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An invalidation hook failed. Only ever logged, never returned to callers.
    #[error("Invalidation hook failed for key '{key}': {message}")]
    HookExecution { key: String, message: String },

    /// File lock could not be acquired or inspected
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Config file read/write failed
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

// == Lock Error Enum ==
/// Failures of the cross-process file lock.
#[derive(Error, Debug)]
pub enum LockError {
    /// The lock file stayed in place for the whole timeout budget
    #[error(
        "Failed to acquire lock on {} after {}ms. Another process may be holding the lock. Lock file: {}",
        path.display(),
        waited.as_millis(),
        lock_path.display()
    )]
    Timeout {
        path: PathBuf,
        lock_path: PathBuf,
        waited: Duration,
    },

    /// Any other I/O failure while creating or writing the lock file
    #[error("Lock I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LockError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// == Settings Error Enum ==
/// Failures of locked config-file reads and writes.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("Config file I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SettingsError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) | CacheError::InvalidConfig(_) => {
                StatusCode::BAD_REQUEST
            }
            CacheError::Lock(LockError::Timeout { .. })
            | CacheError::Settings(SettingsError::Lock(LockError::Timeout { .. })) => {
                StatusCode::LOCKED
            }
            CacheError::HookExecution { .. }
            | CacheError::Lock(_)
            | CacheError::Settings(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache and API operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_timeout_message_names_paths() {
        let err = LockError::Timeout {
            path: PathBuf::from("/tmp/settings.json"),
            lock_path: PathBuf::from("/tmp/settings.json.lock"),
            waited: Duration::from_millis(250),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/settings.json"));
        assert!(msg.contains("/tmp/settings.json.lock"));
        assert!(msg.contains("250ms"));
    }

    #[test]
    fn test_status_codes() {
        let not_found = CacheError::NotFound("k".into()).into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let bad = CacheError::InvalidRequest("k".into()).into_response();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let locked = CacheError::Lock(LockError::Timeout {
            path: PathBuf::from("a"),
            lock_path: PathBuf::from("a.lock"),
            waited: Duration::from_millis(1),
        })
        .into_response();
        assert_eq!(locked.status(), StatusCode::LOCKED);
    }
}
