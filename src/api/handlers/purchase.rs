//! Checkout handlers: start a purchase, receive the provider callback.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use super::{parse_content_type, parse_object_id, parse_ref_id};
use crate::api::dto::{CallbackQuery, CallbackResponse, StartResponse};
use crate::api::extract::CurrentUser;
use crate::app_state::AppState;
use crate::error::{CheckoutError, ErrorResponse};
use crate::service::CallbackParams;

/// `POST /purchase/start/{content_type}/{object_id}` — Start a checkout.
///
/// # Errors
///
/// Returns [`CheckoutError`] for unknown or inactive content, maintenance
/// mode, or a payment provider failure.
#[utoipa::path(
    post,
    path = "/purchase/start/{content_type}/{object_id}",
    tag = "Checkout",
    summary = "Start a checkout",
    description = "Opens a payment session for the item and answers with a redirect to the provider. Items the caller already owns and free items redirect straight to the content page.",
    params(
        ("content_type" = String, Path, description = "book, podcast, or course"),
        ("object_id" = i64, Path, description = "Catalog id"),
    ),
    security(("bearer" = [])),
    responses(
        (status = 303, description = "Redirect to the provider or the content page", body = StartResponse),
        (status = 400, description = "Unknown content type", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 404, description = "Content missing or inactive", body = ErrorResponse),
        (status = 502, description = "Payment provider failure", body = ErrorResponse),
        (status = 503, description = "Maintenance mode", body = ErrorResponse),
    )
)]
pub async fn start_purchase(
    State(state): State<AppState>,
    CurrentUser(customer): CurrentUser,
    Path((content_type, object_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, CheckoutError> {
    let content_type = parse_content_type(&content_type)?;
    let object_id = parse_object_id(&object_id)?;
    let outcome = state
        .checkout
        .start(&customer, content_type, object_id, &state.settings)
        .await?;
    let body = StartResponse::from(outcome);
    Ok((
        StatusCode::SEE_OTHER,
        [(LOCATION, body.location.clone())],
        Json(body),
    ))
}

/// `GET /purchase/callback/{ref_id}` — Provider return point.
///
/// # Errors
///
/// Returns [`CheckoutError::PurchaseNotFound`] for an unknown reference.
#[utoipa::path(
    get,
    path = "/purchase/callback/{ref_id}",
    tag = "Checkout",
    summary = "Payment provider callback",
    description = "Settles the purchase: verifies it with the provider when the buyer paid, fails it otherwise. Repeated deliveries report the settled outcome without contacting the provider again.",
    params(
        ("ref_id" = String, Path, description = "Purchase reference"),
        CallbackQuery,
    ),
    responses(
        (status = 200, description = "Outcome of the payment", body = CallbackResponse),
        (status = 404, description = "Unknown purchase", body = ErrorResponse),
    )
)]
pub async fn payment_callback(
    State(state): State<AppState>,
    Path(ref_id): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, CheckoutError> {
    let ref_id = parse_ref_id(&ref_id)?;
    let query = CallbackQuery::from_pairs(&pairs);
    let params = CallbackParams {
        status: query.status,
        authority: query.authority,
    };
    let outcome = state.checkout.callback(&ref_id, &params).await?;
    Ok((StatusCode::OK, Json(CallbackResponse::from(outcome))))
}

/// Checkout routes mounted at the root level (the callback URL is handed
/// to the provider and must stay stable).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/purchase/start/{content_type}/{object_id}",
            post(start_purchase),
        )
        .route("/purchase/callback/{ref_id}", get(payment_callback))
}
