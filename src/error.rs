//! Checkout error types with HTTP status code mapping.
//!
//! [`CheckoutError`] is the single error type that crosses the service
//! boundary. Ledger, catalog, identity, and payment-provider failures are
//! translated into it so that no transport or storage error reaches a
//! caller unclassified.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::catalog::CatalogError;
use crate::domain::{ContentType, RefId};
use crate::identity::IdentityError;
use crate::ledger::LedgerError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4001,
///     "message": "payment provider error: could not reach the payment provider",
///     "details": { "ref_id": "3F2A9C01B7D44E1A", "destination": "/books/little-prince/" }
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`CheckoutError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category         | HTTP Status                        |
/// |-----------|------------------|------------------------------------|
/// | 1000–1999 | Validation/Auth  | 400 / 401 / 403                    |
/// | 2000–2999 | State/Not Found  | 404 Not Found / 409 Conflict       |
/// | 3000–3999 | Server           | 500 / 503                          |
/// | 4000–4999 | Payment provider | 502 Bad Gateway                    |
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// Content type string is not one of book, podcast, course.
    #[error("invalid content type: {0}")]
    InvalidContentType(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No valid session accompanied a request that needs one.
    #[error("authentication required")]
    Unauthorized,

    /// Administrative token missing or wrong.
    #[error("forbidden")]
    Forbidden,

    /// The catalog has no such item.
    #[error("invalid content: {content_type} {object_id} does not exist")]
    ContentNotFound {
        /// Requested kind.
        content_type: ContentType,
        /// Requested id.
        object_id: i64,
    },

    /// The item exists but is not on sale.
    #[error("invalid content: {content_type} {object_id} is not available")]
    ContentInactive {
        /// Requested kind.
        content_type: ContentType,
        /// Requested id.
        object_id: i64,
    },

    /// No purchase has the given reference.
    #[error("purchase not found: {0}")]
    PurchaseNotFound(String),

    /// The purchase is not in a status that allows the request.
    #[error("invalid purchase state: {0}")]
    InvalidTransition(String),

    /// New checkouts are paused.
    #[error("{0}")]
    Maintenance(String),

    /// Ledger, catalog, or identity store failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The payment provider could not open the session. The purchase, if
    /// one was created, has already been marked failed.
    #[error("payment provider error: {message}")]
    PaymentGateway {
        /// Buyer-facing message.
        message: String,
        /// Failed purchase, for support lookup.
        ref_id: Option<RefId>,
        /// Where the buyer should be sent back to.
        destination: Option<String>,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CheckoutError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidContentType(_) => 1001,
            Self::InvalidRequest(_) => 1002,
            Self::Unauthorized => 1010,
            Self::Forbidden => 1011,
            Self::ContentNotFound { .. } => 2001,
            Self::ContentInactive { .. } => 2002,
            Self::PurchaseNotFound(_) => 2003,
            Self::InvalidTransition(_) => 2004,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::Maintenance(_) => 3002,
            Self::PaymentGateway { .. } => 4001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidContentType(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::ContentNotFound { .. }
            | Self::ContentInactive { .. }
            | Self::PurchaseNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition(_) => StatusCode::CONFLICT,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Maintenance(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::PaymentGateway { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::PaymentGateway {
                ref_id,
                destination,
                ..
            } => Some(serde_json::json!({
                "ref_id": ref_id,
                "destination": destination,
            })),
            _ => None,
        }
    }
}

impl From<LedgerError> for CheckoutError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::NotFound(ref_id) => Self::PurchaseNotFound(ref_id.to_string()),
            LedgerError::State(state) => Self::InvalidTransition(state.to_string()),
            LedgerError::Conflict(ref_id) => {
                Self::InvalidTransition(format!("purchase {ref_id} was modified concurrently"))
            }
            LedgerError::Storage(msg) => Self::Persistence(msg),
        }
    }
}

impl From<CatalogError> for CheckoutError {
    fn from(e: CatalogError) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<IdentityError> for CheckoutError {
    fn from(e: IdentityError) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl IntoResponse for CheckoutError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
