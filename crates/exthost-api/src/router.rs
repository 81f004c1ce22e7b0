//! Route definitions for the exthost HTTP API.
//!
//! Host routes are matched first; every other path falls through to the
//! endpoint extension mounted at its prefix.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
///
/// Receives the fully-constructed `AppState` and threads it through
/// every route via `.with_state(state)`.
pub fn build_router(state: AppState) -> Router {
    let cors = middleware::cors::build_cors_layer(&state.config.server.cors);

    Router::new()
        .merge(server_routes())
        .merge(extension_routes())
        .fallback(handlers::extensions::dispatch)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Server health
fn server_routes() -> Router<AppState> {
    Router::new().route("/server/health", get(handlers::health::health))
}

/// App bundle, chunks, embeds and reload
fn extension_routes() -> Router<AppState> {
    Router::new()
        .route("/extensions/sources/index.js", get(handlers::extensions::app_bundle))
        .route("/extensions/sources/{chunk}", get(handlers::extensions::app_chunk))
        .route("/extensions/embeds", get(handlers::extensions::embeds))
        .route("/extensions/reload", post(handlers::extensions::reload))
}
