//! Domain events reflecting purchase state changes.
//!
//! Every ledger mutation emits a [`PurchaseEvent`] through the
//! [`super::EventBus`]. Events are appended to the `purchase_events` audit
//! table when the event log is enabled.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Amount, ContentType, Purchase, PurchaseStatus, RefId, UserId};

/// Domain event emitted after every purchase mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PurchaseEvent {
    /// A pending purchase was created at checkout start.
    PurchaseCreated {
        /// Purchase reference.
        ref_id: RefId,
        /// Buyer.
        user_id: Option<UserId>,
        /// Kind of content.
        content_type: ContentType,
        /// Catalog id of the content.
        object_id: i64,
        /// Price charged.
        amount: Amount,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The gateway issued an authority for the purchase.
    AuthorityAttached {
        /// Purchase reference.
        ref_id: RefId,
        /// Provider session token.
        authority: String,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The provider verified the payment.
    PurchaseSucceeded {
        /// Purchase reference.
        ref_id: RefId,
        /// Provider receipt id.
        provider_ref_id: String,
        /// Payment time.
        timestamp: DateTime<Utc>,
    },

    /// The payment was cancelled, rejected, or could not be started.
    PurchaseFailed {
        /// Purchase reference.
        ref_id: RefId,
        /// Short machine-readable cause.
        reason: String,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A stale pending purchase was closed by the sweep.
    PurchaseExpired {
        /// Purchase reference.
        ref_id: RefId,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An administrator refunded a successful purchase.
    PurchaseRefunded {
        /// Purchase reference.
        ref_id: RefId,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl PurchaseEvent {
    /// Builds the creation event for a freshly stored purchase.
    #[must_use]
    pub fn created(purchase: &Purchase) -> Self {
        Self::PurchaseCreated {
            ref_id: purchase.ref_id.clone(),
            user_id: purchase.user_id,
            content_type: purchase.content_type,
            object_id: purchase.object_id,
            amount: purchase.amount,
            timestamp: purchase.created_at,
        }
    }

    /// Returns the purchase reference associated with this event.
    #[must_use]
    pub fn ref_id(&self) -> &RefId {
        match self {
            Self::PurchaseCreated { ref_id, .. }
            | Self::AuthorityAttached { ref_id, .. }
            | Self::PurchaseSucceeded { ref_id, .. }
            | Self::PurchaseFailed { ref_id, .. }
            | Self::PurchaseExpired { ref_id, .. }
            | Self::PurchaseRefunded { ref_id, .. } => ref_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::PurchaseCreated { .. } => "purchase_created",
            Self::AuthorityAttached { .. } => "authority_attached",
            Self::PurchaseSucceeded { .. } => "purchase_succeeded",
            Self::PurchaseFailed { .. } => "purchase_failed",
            Self::PurchaseExpired { .. } => "purchase_expired",
            Self::PurchaseRefunded { .. } => "purchase_refunded",
        }
    }

    /// Status the purchase holds after this event.
    #[must_use]
    pub const fn resulting_status(&self) -> PurchaseStatus {
        match self {
            Self::PurchaseCreated { .. } | Self::AuthorityAttached { .. } => {
                PurchaseStatus::Pending
            }
            Self::PurchaseSucceeded { .. } => PurchaseStatus::Success,
            Self::PurchaseFailed { .. } | Self::PurchaseExpired { .. } => PurchaseStatus::Failed,
            Self::PurchaseRefunded { .. } => PurchaseStatus::Refunded,
        }
    }
}
