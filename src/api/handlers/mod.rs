//! REST endpoint handlers organized by resource.

pub mod access;
pub mod account;
pub mod admin;
pub mod purchase;
pub mod system;

use axum::Router;

use crate::app_state::AppState;
use crate::domain::{ContentType, RefId};
use crate::error::CheckoutError;

/// Composes the JSON query routes mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(access::routes())
        .merge(account::routes())
}

/// Parses a content type path segment.
pub(crate) fn parse_content_type(raw: &str) -> Result<ContentType, CheckoutError> {
    raw.parse()
        .map_err(|_| CheckoutError::InvalidContentType(raw.to_string()))
}

/// Parses a catalog id path segment.
pub(crate) fn parse_object_id(raw: &str) -> Result<i64, CheckoutError> {
    raw.parse()
        .map_err(|_| CheckoutError::InvalidRequest(format!("invalid object id: {raw}")))
}

/// Parses a reference path segment; a malformed one cannot name a purchase.
pub(crate) fn parse_ref_id(raw: &str) -> Result<RefId, CheckoutError> {
    raw.parse()
        .map_err(|_| CheckoutError::PurchaseNotFound(raw.to_string()))
}
