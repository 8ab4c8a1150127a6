//! Administrative purchase management: list, inspect, refund.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use super::parse_ref_id;
use crate::api::dto::{
    AdminPurchaseQuery, PaginationMeta, PurchaseDto, PurchaseListResponse, clamp_page,
};
use crate::api::extract::AdminAccess;
use crate::app_state::AppState;
use crate::error::{CheckoutError, ErrorResponse};
use crate::ledger::PurchaseFilter;

/// `GET /admin/purchases` — Search all purchases.
///
/// # Errors
///
/// Returns [`CheckoutError::Forbidden`] without the admin token.
#[utoipa::path(
    get,
    path = "/admin/purchases",
    tag = "Admin",
    summary = "List purchases",
    description = "Newest first. `search` matches the ref id, authority, provider receipt, or the buyer's phone number.",
    params(AdminPurchaseQuery),
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Paginated purchase list", body = PurchaseListResponse),
        (status = 403, description = "Missing or wrong admin token", body = ErrorResponse),
    )
)]
pub async fn list_purchases(
    State(state): State<AppState>,
    _admin: AdminAccess,
    Query(query): Query<AdminPurchaseQuery>,
) -> Result<impl IntoResponse, CheckoutError> {
    let page = clamp_page(query.page, query.per_page);
    let filter = PurchaseFilter {
        user_id: None,
        status: query.status,
        content_type: query.content_type,
        search: query.search,
    };
    let result = state.checkout.list_purchases(&filter, page).await?;
    Ok((
        StatusCode::OK,
        Json(PurchaseListResponse {
            purchases: result.items.into_iter().map(PurchaseDto::from).collect(),
            pagination: PaginationMeta::new(page, result.total),
        }),
    ))
}

/// `GET /admin/purchases/{ref_id}` — One purchase.
///
/// # Errors
///
/// Returns [`CheckoutError::PurchaseNotFound`] for an unknown reference.
#[utoipa::path(
    get,
    path = "/admin/purchases/{ref_id}",
    tag = "Admin",
    summary = "Get purchase",
    params(("ref_id" = String, Path, description = "Purchase reference")),
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "The purchase", body = PurchaseDto),
        (status = 403, description = "Missing or wrong admin token", body = ErrorResponse),
        (status = 404, description = "Unknown purchase", body = ErrorResponse),
    )
)]
pub async fn get_purchase(
    State(state): State<AppState>,
    _admin: AdminAccess,
    Path(ref_id): Path<String>,
) -> Result<impl IntoResponse, CheckoutError> {
    let ref_id = parse_ref_id(&ref_id)?;
    let purchase = state.checkout.get_purchase(&ref_id).await?;
    Ok((StatusCode::OK, Json(PurchaseDto::from(purchase))))
}

/// `POST /admin/purchases/{ref_id}/refund` — Refund a successful purchase.
///
/// # Errors
///
/// Returns [`CheckoutError::InvalidTransition`] unless the purchase is in
/// success.
#[utoipa::path(
    post,
    path = "/admin/purchases/{ref_id}/refund",
    tag = "Admin",
    summary = "Refund purchase",
    description = "Moves a successful purchase to refunded, revoking the buyer's access. The money itself is returned outside this service.",
    params(("ref_id" = String, Path, description = "Purchase reference")),
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "The refunded purchase", body = PurchaseDto),
        (status = 403, description = "Missing or wrong admin token", body = ErrorResponse),
        (status = 404, description = "Unknown purchase", body = ErrorResponse),
        (status = 409, description = "Purchase is not in success", body = ErrorResponse),
    )
)]
pub async fn refund_purchase(
    State(state): State<AppState>,
    _admin: AdminAccess,
    Path(ref_id): Path<String>,
) -> Result<impl IntoResponse, CheckoutError> {
    let ref_id = parse_ref_id(&ref_id)?;
    let purchase = state.checkout.refund(&ref_id).await?;
    Ok((StatusCode::OK, Json(PurchaseDto::from(purchase))))
}

/// Administrative routes mounted at `/admin`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/purchases", get(list_purchases))
        .route("/admin/purchases/{ref_id}", get(get_purchase))
        .route("/admin/purchases/{ref_id}/refund", post(refund_purchase))
}
