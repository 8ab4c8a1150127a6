//! Content access query.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use super::{parse_content_type, parse_object_id};
use crate::api::dto::AccessResponse;
use crate::api::extract::MaybeUser;
use crate::app_state::AppState;
use crate::error::{CheckoutError, ErrorResponse};

/// `GET /access/{content_type}/{object_id}` — May the caller open this item?
///
/// # Errors
///
/// Returns [`CheckoutError`] for an unknown content type or item.
#[utoipa::path(
    get,
    path = "/api/v1/access/{content_type}/{object_id}",
    tag = "Access",
    summary = "Check content access",
    description = "Free items are open to everyone. Other items need a successful purchase by the signed-in caller; anonymous callers never have access to them.",
    params(
        ("content_type" = String, Path, description = "book, podcast, or course"),
        ("object_id" = i64, Path, description = "Catalog id"),
    ),
    responses(
        (status = 200, description = "Access decision", body = AccessResponse),
        (status = 400, description = "Unknown content type", body = ErrorResponse),
        (status = 404, description = "Unknown item", body = ErrorResponse),
    )
)]
pub async fn check_access(
    State(state): State<AppState>,
    MaybeUser(customer): MaybeUser,
    Path((content_type, object_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, CheckoutError> {
    let content_type = parse_content_type(&content_type)?;
    let object_id = parse_object_id(&object_id)?;
    let has_access = state
        .checkout
        .content_access(customer.as_ref(), content_type, object_id)
        .await?;
    Ok((
        StatusCode::OK,
        Json(AccessResponse {
            content_type,
            object_id,
            has_access,
        }),
    ))
}

/// Access routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/access/{content_type}/{object_id}", get(check_access))
}
