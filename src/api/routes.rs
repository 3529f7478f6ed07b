//! API Routes
//!
//! Configures the Axum router with all store server endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, expire_handler, get_handler, health_handler, pop_handler, push_handler,
    set_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET|PUT|DELETE /kv?key=` - Read, write or delete a byte value
/// - `POST /kv/expire?key=&ttl_ms=` - Apply a TTL
/// - `POST /list/push?key=&ttl_ms=` - Push an item and re-apply the list TTL
/// - `POST /list/pop?key=&timeout_ms=` - Blocking pop (204 on timeout)
/// - `GET /stats` - Store statistics
/// - `GET /health` - Health check endpoint
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
        .route(
            "/kv",
            get(get_handler).put(set_handler).delete(delete_handler),
        )
        .route("/kv/expire", post(expire_handler))
        .route("/list/push", post(push_handler))
        .route("/list/pop", post(pop_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
