//! The purchase ledger entry and its status machine.
//!
//! ```text
//!            attach_authority
//!   Pending ───────────────► Pending
//!      │
//!      ├── succeed ──► Success ── refund ──► Refunded
//!      └── fail ─────► Failed
//! ```
//!
//! Every mutation goes through a method on [`Purchase`] so that the
//! `paid_at ⇔ Success` rule and the one-way status order hold for both
//! ledger backends.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Amount, ContentType, RefId, UserId};

/// Lifecycle status of a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// Created, waiting for the provider callback.
    Pending,
    /// Verified by the provider; grants access.
    Success,
    /// Cancelled, rejected, or expired.
    Failed,
    /// Reversed by an administrator after success.
    Refunded,
}

impl PurchaseStatus {
    /// Returns the storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    /// Returns `true` once the checkout flow can no longer change the entry.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether `self → next` is an allowed move.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Success | Self::Failed) | (Self::Success, Self::Refunded)
        )
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            other => Err(format!("unknown purchase status: {other:?}")),
        }
    }
}

/// Rejected mutation of a purchase.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PurchaseStateError {
    /// The requested status move is not in the status machine.
    #[error("purchase {ref_id}: cannot move from {from} to {to}")]
    InvalidTransition {
        /// Purchase reference.
        ref_id: RefId,
        /// Current status.
        from: PurchaseStatus,
        /// Requested status.
        to: PurchaseStatus,
    },

    /// The gateway authority was already recorded.
    #[error("purchase {0}: authority already attached")]
    AuthorityAlreadySet(RefId),

    /// The authority can only be recorded while pending.
    #[error("purchase {ref_id}: authority cannot be attached in status {status}")]
    NotPending {
        /// Purchase reference.
        ref_id: RefId,
        /// Current status.
        status: PurchaseStatus,
    },
}

/// Fields supplied when a checkout is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPurchase {
    /// Buyer.
    pub user_id: UserId,
    /// Kind of content bought.
    pub content_type: ContentType,
    /// Catalog id of the content.
    pub object_id: i64,
    /// Price charged.
    pub amount: Amount,
}

/// One attempt to acquire access to one content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    /// Unique order code.
    pub ref_id: RefId,
    /// Buyer; `None` once the user account has been deleted.
    pub user_id: Option<UserId>,
    /// Kind of content bought.
    pub content_type: ContentType,
    /// Catalog id of the content (loose reference).
    pub object_id: i64,
    /// Price charged.
    pub amount: Amount,
    /// Provider payment-session token, set once after initiation.
    pub authority: Option<String>,
    /// Provider receipt id, set on success.
    pub provider_ref_id: Option<String>,
    /// Lifecycle status.
    pub status: PurchaseStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Payment confirmation time; present exactly when status is success.
    pub paid_at: Option<DateTime<Utc>>,
}

impl Purchase {
    /// Builds a fresh pending entry with a new reference id.
    #[must_use]
    pub fn new(new: NewPurchase, created_at: DateTime<Utc>) -> Self {
        Self {
            ref_id: RefId::new(),
            user_id: Some(new.user_id),
            content_type: new.content_type,
            object_id: new.object_id,
            amount: new.amount,
            authority: None,
            provider_ref_id: None,
            status: PurchaseStatus::Pending,
            created_at,
            paid_at: None,
        }
    }

    /// Returns `true` if the purchase was paid and not refunded.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.status == PurchaseStatus::Success
    }

    /// Records the gateway authority.
    ///
    /// # Errors
    ///
    /// Fails if the entry is no longer pending or already has an authority.
    pub fn attach_authority(&mut self, authority: &str) -> Result<(), PurchaseStateError> {
        if self.status != PurchaseStatus::Pending {
            return Err(PurchaseStateError::NotPending {
                ref_id: self.ref_id.clone(),
                status: self.status,
            });
        }
        if self.authority.is_some() {
            return Err(PurchaseStateError::AuthorityAlreadySet(self.ref_id.clone()));
        }
        self.authority = Some(authority.to_string());
        Ok(())
    }

    /// Moves to `Success`, recording the receipt and payment time.
    ///
    /// # Errors
    ///
    /// Fails unless the entry is pending.
    pub fn succeed(
        &mut self,
        provider_ref_id: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<(), PurchaseStateError> {
        self.check_transition(PurchaseStatus::Success)?;
        self.status = PurchaseStatus::Success;
        self.provider_ref_id = Some(provider_ref_id.to_string());
        self.paid_at = Some(paid_at);
        Ok(())
    }

    /// Moves to `Failed`.
    ///
    /// # Errors
    ///
    /// Fails unless the entry is pending.
    pub fn fail(&mut self) -> Result<(), PurchaseStateError> {
        self.check_transition(PurchaseStatus::Failed)?;
        self.status = PurchaseStatus::Failed;
        Ok(())
    }

    /// Moves a successful purchase to `Refunded`, revoking access.
    ///
    /// `paid_at` is cleared so that it stays present only for `Success`;
    /// the provider receipt is kept for bookkeeping.
    ///
    /// # Errors
    ///
    /// Fails unless the entry is in `Success`.
    pub fn refund(&mut self) -> Result<(), PurchaseStateError> {
        self.check_transition(PurchaseStatus::Refunded)?;
        self.status = PurchaseStatus::Refunded;
        self.paid_at = None;
        Ok(())
    }

    fn check_transition(&self, to: PurchaseStatus) -> Result<(), PurchaseStateError> {
        if self.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(PurchaseStateError::InvalidTransition {
                ref_id: self.ref_id.clone(),
                from: self.status,
                to,
            })
        }
    }
}
