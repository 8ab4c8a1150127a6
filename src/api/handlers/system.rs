//! System endpoints: health check and supported content types.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::ContentType;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
    maintenance_mode: bool,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, maintenance flag, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            maintenance_mode: state.settings.maintenance_mode,
        }),
    )
}

/// Supported content type info.
#[derive(Debug, Serialize, ToSchema)]
pub struct ContentTypeInfo {
    content_type: ContentType,
    detail_path: String,
}

/// `GET /config/content-types` — List purchasable content types.
#[utoipa::path(
    get,
    path = "/config/content-types",
    tag = "System",
    summary = "List content types",
    description = "Returns every content type accepted by the checkout and access endpoints.",
    responses(
        (status = 200, description = "Content type catalog", body = Vec<ContentTypeInfo>),
    )
)]
pub async fn content_types_handler() -> impl IntoResponse {
    let types: Vec<ContentTypeInfo> = ContentType::ALL
        .into_iter()
        .map(|content_type| ContentTypeInfo {
            content_type,
            detail_path: format!("/{}/{{slug}}/", content_type.table()),
        })
        .collect();
    (StatusCode::OK, Json(types))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/content-types", get(content_types_handler))
}
