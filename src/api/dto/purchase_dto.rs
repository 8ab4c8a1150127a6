//! DTOs for the checkout, access, account, and admin endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::{PaginationMeta, default_page, default_per_page};
use crate::domain::{Amount, ContentType, Purchase, PurchaseStatus, RefId, UserId};
use crate::service::{CallbackOutcome, StartOutcome};

/// What the start endpoint decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StartKind {
    /// Go to the provider's payment page.
    Redirect,
    /// The caller already owns the item.
    AlreadyOwned,
    /// The item costs nothing.
    Free,
}

/// Response body of `POST /purchase/start/{content_type}/{object_id}`.
///
/// Sent with `303 See Other`; `location` repeats the `Location` header.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StartResponse {
    /// Decision taken.
    pub outcome: StartKind,
    /// Where the caller goes next.
    pub location: String,
    /// Pending purchase, for [`StartKind::Redirect`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<RefId>,
    /// Buyer-facing message.
    pub message: String,
}

impl From<StartOutcome> for StartResponse {
    fn from(outcome: StartOutcome) -> Self {
        match outcome {
            StartOutcome::Redirect {
                ref_id,
                redirect_url,
            } => Self {
                outcome: StartKind::Redirect,
                location: redirect_url,
                ref_id: Some(ref_id),
                message: "Redirecting to the payment page.".to_string(),
            },
            StartOutcome::AlreadyOwned { destination } => Self {
                outcome: StartKind::AlreadyOwned,
                location: destination,
                ref_id: None,
                message: "You already have access to this item.".to_string(),
            },
            StartOutcome::Free { destination } => Self {
                outcome: StartKind::Free,
                location: destination,
                ref_id: None,
                message: "This item is free.".to_string(),
            },
        }
    }
}

/// Query parameters the provider appends to the callback URL.
///
/// The provider sends `Status` and `Authority`; names are matched without
/// regard to case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    /// `OK` when the buyer completed payment, anything else otherwise.
    #[serde(alias = "Status")]
    pub status: Option<String>,
    /// Provider session token.
    #[serde(alias = "Authority")]
    pub authority: Option<String>,
}

impl CallbackQuery {
    /// Builds the query from raw pairs in arrival order.
    ///
    /// A name repeated with different values is ambiguous and yields
    /// `None`, which the checkout treats as a failed payment.
    #[must_use]
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            status: single_value(pairs, "status"),
            authority: single_value(pairs, "authority"),
        }
    }
}

fn single_value(pairs: &[(String, String)], name: &str) -> Option<String> {
    let mut values = pairs
        .iter()
        .filter(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value);
    let first = values.next()?;
    if values.all(|value| value == first) {
        Some(first.clone())
    } else {
        None
    }
}

/// Response body of `GET /purchase/callback/{ref_id}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CallbackResponse {
    /// Whether the purchase ended in success.
    pub success: bool,
    /// Buyer-facing message.
    pub message: String,
    /// Purchase reference, for support lookup.
    pub ref_id: RefId,
    /// Terminal status.
    pub status: PurchaseStatus,
    /// Provider receipt, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_ref_id: Option<String>,
    /// Content page, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    /// `true` when an earlier callback had already settled the purchase.
    pub replayed: bool,
}

impl From<CallbackOutcome> for CallbackResponse {
    fn from(outcome: CallbackOutcome) -> Self {
        let success = outcome.is_success();
        Self {
            success,
            message: outcome.message,
            ref_id: outcome.purchase.ref_id,
            status: outcome.purchase.status,
            provider_ref_id: outcome.purchase.provider_ref_id,
            content_url: outcome.content_url,
            replayed: outcome.replayed,
        }
    }
}

/// A purchase as exposed over the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseDto {
    /// Order code.
    pub ref_id: RefId,
    /// Buyer; absent once the account was deleted.
    pub user_id: Option<UserId>,
    /// Kind of content.
    pub content_type: ContentType,
    /// Catalog id.
    pub object_id: i64,
    /// Price in Toman.
    pub amount: Amount,
    /// Provider session token.
    pub authority: Option<String>,
    /// Provider receipt.
    pub provider_ref_id: Option<String>,
    /// Lifecycle status.
    pub status: PurchaseStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Payment time.
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<Purchase> for PurchaseDto {
    fn from(p: Purchase) -> Self {
        Self {
            ref_id: p.ref_id,
            user_id: p.user_id,
            content_type: p.content_type,
            object_id: p.object_id,
            amount: p.amount,
            authority: p.authority,
            provider_ref_id: p.provider_ref_id,
            status: p.status,
            created_at: p.created_at,
            paid_at: p.paid_at,
        }
    }
}

/// A page of purchases.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseListResponse {
    /// Purchases, newest first.
    pub purchases: Vec<PurchaseDto>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Response of the content access query.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccessResponse {
    /// Kind of content.
    pub content_type: ContentType,
    /// Catalog id.
    pub object_id: i64,
    /// Whether the caller may open the item.
    pub has_access: bool,
}

/// Filters for the administrative purchase listing.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminPurchaseQuery {
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 100). Defaults to 20.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Only this status.
    pub status: Option<PurchaseStatus>,
    /// Only this content type.
    pub content_type: Option<ContentType>,
    /// Substring of ref id, authority, receipt, or owner phone number.
    pub search: Option<String>,
}
