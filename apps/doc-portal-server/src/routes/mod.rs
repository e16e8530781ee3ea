//! Route modules for Doc Portal Server

pub mod documents;
pub mod events;
pub mod health;
pub mod notify;
pub mod results;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full HTTP surface
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api/upload",
            post(documents::upload_document)
                .layer(DefaultBodyLimit::max(documents::MAX_UPLOAD_SIZE)),
        )
        .nest("/api/documents", documents::router())
        .nest("/api/results", results::router())
        .nest("/api/notify", notify::router())
        .nest("/api/events", events::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
