//! REST API layer: route handlers, DTOs, extractors, and router composition.
//!
//! Checkout and admin routes sit at the root so the provider callback URL
//! stays short and stable; JSON queries are mounted under `/api/v1`.

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod openapi;

use axum::Router;

use crate::app_state::AppState;

pub use openapi::ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::purchase::routes())
        .merge(handlers::admin::routes())
        .merge(handlers::system::routes())
}
