//! HTTP server for askui.
//!
//! Provides:
//! - Request lifecycle API (`/api/requests`, `/api/requests/:id`,
//!   `/api/requests/:id/response`, `/api/requests/:id/wait`)
//! - Image upload/serving (`/api/images`, `/api/images/:id`)
//! - Push channel for the web UI (`/ws`)
//! - Health check (`/health`)

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod handlers;
pub mod responses;

/// Create the HTTP router.
///
/// CORS is permissive: clients share one global namespace and the UI may be
/// served from a dev server on another port.
pub fn create_router(state: Arc<AppState>, max_upload_bytes: i64) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Leave headroom over the store limit so multipart framing does not
    // push a maximal upload over the edge.
    let body_limit = (max_upload_bytes as usize).saturating_add(1 << 20);

    Router::new()
        // Request lifecycle
        .route("/api/requests", post(handlers::create_request))
        .route("/api/requests/:id", get(handlers::get_request))
        .route("/api/requests/:id/response", post(handlers::submit_response))
        .route("/api/requests/:id/wait", get(handlers::wait_request))
        // Images
        .route(
            "/api/images",
            post(handlers::upload_image).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/images/:id", get(handlers::get_image))
        // Push channel
        .route("/ws", get(handlers::ws_handler))
        // Observability
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
