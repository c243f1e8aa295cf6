//! Plugin State - shared-state protection for plugin configuration
//!
//! An in-process LRU/TTL cache with event-driven invalidation, plus a
//! cross-process file lock that serializes writes to on-disk config files.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod hooks;
pub mod lock;
pub mod models;
pub mod settings;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_cleanup_task;
