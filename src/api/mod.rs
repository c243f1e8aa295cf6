//! API Module
//!
//! HTTP handlers and routing for the local admin API: cache inspection and
//! invalidation, domain events, config files and lock diagnostics.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
