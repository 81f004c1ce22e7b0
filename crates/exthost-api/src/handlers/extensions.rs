//! Extension handlers: app bundle, chunks, embeds, reload and endpoint dispatch.

use axum::Json;
use axum::extract::{Path, Request, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tracing::info;

use exthost_core::AppError;
use exthost_extensions::embeds::EmbedSnapshot;

use crate::dto::{ApiResponse, RegistrationReport, ReloadResponse};
use crate::error::ApiError;
use crate::state::AppState;

const JAVASCRIPT: &str = "text/javascript; charset=UTF-8";

fn javascript(code: String) -> Response {
    ([(header::CONTENT_TYPE, JAVASCRIPT)], code).into_response()
}

/// GET /extensions/sources/index.js
pub async fn app_bundle(State(state): State<AppState>) -> Result<Response, ApiError> {
    let code = state
        .bundler
        .app_extensions()
        .await
        .ok_or_else(|| AppError::service_unavailable("App extensions bundle is not available"))?;
    Ok(javascript(code))
}

/// GET /extensions/sources/{chunk}
pub async fn app_chunk(State(state): State<AppState>, Path(chunk): Path<String>) -> Result<Response, ApiError> {
    let code = state
        .bundler
        .get_app_extension_chunk(&chunk)
        .await
        .ok_or_else(|| AppError::not_found(format!("App extension chunk '{chunk}' not found")))?;
    Ok(javascript(code))
}

/// GET /extensions/embeds
pub async fn embeds(State(state): State<AppState>) -> Json<ApiResponse<EmbedSnapshot>> {
    Json(ApiResponse::ok(state.embeds.snapshot().await))
}

/// POST /extensions/reload
///
/// Tears every API extension down, registers them again, then rebuilds the
/// app bundle. The manager lock is held for the whole registration pass.
pub async fn reload(State(state): State<AppState>) -> Json<ApiResponse<ReloadResponse>> {
    let summaries = {
        let mut manager = state.manager.lock().await;
        manager.reload().await
    };
    let bundled = state.bundler.generate_extension_bundle().await.is_some();

    info!(bundled, "Extensions reloaded");

    Json(ApiResponse::ok(ReloadResponse {
        registrations: summaries.into_iter().map(RegistrationReport::from).collect(),
        bundled,
    }))
}

/// Fallback: hands the request to the endpoint extension mounted at its path.
pub async fn dispatch(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    let path = request.uri().path().to_string();
    let router = state
        .router
        .route_for(&path)
        .await
        .ok_or_else(|| AppError::not_found(format!("Route {path} doesn't exist")))?;

    match router.oneshot(request).await {
        Ok(response) => Ok(response),
        Err(never) => match never {},
    }
}
