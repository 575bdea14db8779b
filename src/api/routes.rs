//! API Routes
//!
//! Configures the Axum router for the member protocol.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_delete_handler, cache_get_handler, cache_put_handler, contains_handler, health_handler,
    invoke_handler, peek_handler, stats_handler, AppState,
};
use crate::cache::MAX_VALUE_SIZE;

/// Creates the member router.
///
/// # Endpoints
/// - `POST /cluster/invoke` - Run an operation on this member
/// - `GET|PUT|DELETE /cluster/cache/:namespace/:key` - Raw partition access
/// - `GET /cluster/peek/:namespace/:key` - Read without touching
/// - `GET /cluster/contains/:namespace/:key` - Membership test without touching
/// - `GET /stats` - Per-namespace statistics of this member
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/cluster/invoke", post(invoke_handler))
        .route(
            "/cluster/cache/:namespace/:key",
            get(cache_get_handler)
                .put(cache_put_handler)
                .delete(cache_delete_handler),
        )
        .route("/cluster/peek/:namespace/:key", get(peek_handler))
        .route("/cluster/contains/:namespace/:key", get(contains_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(MAX_VALUE_SIZE))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
