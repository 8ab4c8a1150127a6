//! The signed-in caller's purchase history.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{PaginationMeta, PaginationParams, PurchaseDto, PurchaseListResponse};
use crate::api::extract::CurrentUser;
use crate::app_state::AppState;
use crate::error::{CheckoutError, ErrorResponse};

/// `GET /me/purchases` — The caller's purchases, newest first.
///
/// # Errors
///
/// Returns [`CheckoutError::Unauthorized`] without a valid session.
#[utoipa::path(
    get,
    path = "/api/v1/me/purchases",
    tag = "Account",
    summary = "List my purchases",
    params(PaginationParams),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Paginated purchase list", body = PurchaseListResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
    )
)]
pub async fn my_purchases(
    State(state): State<AppState>,
    CurrentUser(customer): CurrentUser,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, CheckoutError> {
    let page = params.clamped();
    let result = state.checkout.customer_purchases(&customer, page).await?;
    Ok((
        StatusCode::OK,
        Json(PurchaseListResponse {
            purchases: result.items.into_iter().map(PurchaseDto::from).collect(),
            pagination: PaginationMeta::new(page, result.total),
        }),
    ))
}

/// Account routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/me/purchases", get(my_purchases))
}
