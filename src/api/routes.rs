//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, force_unlock_handler, get_handler, health_handler, invalidate_handler,
    invalidate_namespace_handler, lock_status_handler, namespaces_handler, read_settings_handler,
    set_handler, stats_handler, trigger_handler, write_settings_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check
/// - `GET /stats` - Per-namespace statistics
/// - `GET /namespaces` - Instantiated namespaces
/// - `PUT /cache/:namespace` - Store a value
/// - `DELETE /cache/:namespace` - Drop a whole namespace
/// - `GET /cache/:namespace/:key` - Retrieve a value
/// - `DELETE /cache/:namespace/:key` - Delete a value
/// - `POST /cache/:namespace/invalidate` - Invalidate by pattern
/// - `POST /events/:trigger` - Raise a domain event
/// - `GET|PUT /settings/*name` - Read or write a config file
/// - `GET|DELETE /locks/*name` - Inspect or force-remove a file lock
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/namespaces", get(namespaces_handler))
        .route(
            "/cache/:namespace",
            put(set_handler).delete(invalidate_namespace_handler),
        )
        .route("/cache/:namespace/invalidate", post(invalidate_handler))
        .route(
            "/cache/:namespace/:key",
            get(get_handler).delete(delete_handler),
        )
        .route("/events/:trigger", post(trigger_handler))
        .route(
            "/settings/*name",
            get(read_settings_handler).put(write_settings_handler),
        )
        .route(
            "/locks/*name",
            get(lock_status_handler).delete(force_unlock_handler),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheOptions, NamespacedCache};
    use crate::lock::LockOptions;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let cache = NamespacedCache::new(CacheOptions::with_max_size(100)).unwrap();
        let state = AppState::new(cache, LockOptions::default(), std::env::temp_dir());
        create_router(state)
    }

    async fn status_of(request: Request<Body>) -> StatusCode {
        create_test_app().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let request = Request::builder()
            .uri("/stats")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_set_endpoint() {
        let request = Request::builder()
            .method("PUT")
            .uri("/cache/plugins")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"key":"available","value":["a"]}"#))
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let request = Request::builder()
            .uri("/cache/plugins/nonexistent")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_trigger_is_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/events/plugin:explode")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::BAD_REQUEST);
    }
}
