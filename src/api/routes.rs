//! API Route Configuration

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{self, AppState};
use super::middleware::{logging_middleware, rate_limit_middleware};

/// Create the API router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/feeds", post(handlers::create_feed))
        .route(
            "/feeds/:id",
            get(handlers::get_feed).delete(handlers::delete_feed),
        )
        .route("/feeds/:id/price", put(handlers::update_price))
        .route("/feeds/:id/visibility", post(handlers::set_visibility));

    Router::new()
        .nest("/v1", api_v1)
        .route("/health", get(handlers::health_check))
        .with_state(state)
        // Middleware (order matters - bottom runs first)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(rate_limit_middleware))
}
