//! Purchase ledger: the persistent record of every checkout attempt.
//!
//! [`PurchaseLedger`] is the storage contract used by the checkout service.
//! Status changes go through a [`PurchaseLock`], an exclusive claim on one
//! purchase held from the moment its status is read until the new status is
//! written. Two callback deliveries for the same purchase therefore cannot
//! both observe `pending`.
//!
//! Two backends are provided: [`memory::InMemoryLedger`] and
//! [`crate::persistence::postgres::PgLedger`].

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    ContentType, NewPurchase, Purchase, PurchaseStateError, PurchaseStatus, RefId, UserId,
};

pub use memory::InMemoryLedger;

/// Ledger failure.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// No purchase has the given reference.
    #[error("purchase not found: {0}")]
    NotFound(RefId),

    /// The status machine rejected the change.
    #[error(transparent)]
    State(#[from] PurchaseStateError),

    /// The row changed underneath a held lock.
    #[error("purchase {0} was modified concurrently")]
    Conflict(RefId),

    /// Backend failure (database, connection pool, decoding).
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

/// A terminal status change applied under a [`PurchaseLock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    /// `pending → success`.
    Succeed {
        /// Provider receipt id.
        provider_ref_id: String,
        /// Payment confirmation time.
        paid_at: DateTime<Utc>,
    },
    /// `pending → failed`.
    Fail,
    /// `success → refunded`.
    Refund,
}

impl StatusChange {
    /// Applies the change to an in-memory copy, enforcing the status machine.
    ///
    /// # Errors
    ///
    /// Returns [`PurchaseStateError`] if the move is not allowed.
    pub fn apply_to(&self, purchase: &mut Purchase) -> Result<(), PurchaseStateError> {
        match self {
            Self::Succeed {
                provider_ref_id,
                paid_at,
            } => purchase.succeed(provider_ref_id, *paid_at),
            Self::Fail => purchase.fail(),
            Self::Refund => purchase.refund(),
        }
    }
}

/// Exclusive claim on a single purchase.
///
/// Dropping the lock without calling [`PurchaseLock::apply`] releases it
/// and leaves the purchase untouched.
#[async_trait]
pub trait PurchaseLock: Send + fmt::Debug {
    /// The purchase as read under the lock.
    fn purchase(&self) -> &Purchase;

    /// Applies a status change, persists it, and releases the lock.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::State`] for a disallowed move or
    /// [`LedgerError::Storage`] when the write fails.
    async fn apply(self: Box<Self>, change: StatusChange) -> Result<Purchase, LedgerError>;
}

/// Listing filter for the administrative and account views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseFilter {
    /// Only purchases owned by this user.
    pub user_id: Option<UserId>,
    /// Only purchases in this status.
    pub status: Option<PurchaseStatus>,
    /// Only purchases of this content type.
    pub content_type: Option<ContentType>,
    /// Substring of the ref id, authority, or provider receipt. The
    /// Postgres backend also matches the owner's phone number.
    pub search: Option<String>,
}

impl PurchaseFilter {
    /// Whether `purchase` satisfies every field except the phone search.
    #[must_use]
    pub fn matches(&self, purchase: &Purchase) -> bool {
        if let Some(user_id) = self.user_id
            && purchase.user_id != Some(user_id)
        {
            return false;
        }
        if let Some(status) = self.status
            && purchase.status != status
        {
            return false;
        }
        if let Some(content_type) = self.content_type
            && purchase.content_type != content_type
        {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_ascii_uppercase();
                let contains = |v: &str| v.to_ascii_uppercase().contains(&term);
                contains(purchase.ref_id.as_str())
                    || purchase.authority.as_deref().is_some_and(contains)
                    || purchase.provider_ref_id.as_deref().is_some_and(contains)
            }
        }
    }
}

/// One-indexed page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Page number, starting at 1.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
}

impl Page {
    /// Number of rows to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

/// A page of purchases plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchasePage {
    /// Purchases on this page, newest first.
    pub items: Vec<Purchase>,
    /// Total matches across all pages.
    pub total: u64,
}

/// Storage contract for purchases.
#[async_trait]
pub trait PurchaseLedger: Send + Sync + fmt::Debug {
    /// Stores a fresh pending purchase with a new reference id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] on backend failure.
    async fn create(&self, new: NewPurchase) -> Result<Purchase, LedgerError>;

    /// Reads a purchase without locking it.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] on backend failure.
    async fn get(&self, ref_id: &RefId) -> Result<Option<Purchase>, LedgerError>;

    /// Records the gateway authority on a pending purchase, exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`], or [`LedgerError::State`] if an
    /// authority is already present or the purchase is no longer pending.
    async fn attach_authority(
        &self,
        ref_id: &RefId,
        authority: &str,
    ) -> Result<Purchase, LedgerError>;

    /// Takes the exclusive lock on a purchase, waiting for any other holder.
    ///
    /// Returns `None` when no purchase has the reference.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] on backend failure.
    async fn lock(&self, ref_id: &RefId) -> Result<Option<Box<dyn PurchaseLock>>, LedgerError>;

    /// Whether `user` owns a successful purchase of the given content.
    ///
    /// Always `false` for an anonymous caller.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] on backend failure.
    async fn has_access(
        &self,
        user: Option<UserId>,
        content_type: ContentType,
        object_id: i64,
    ) -> Result<bool, LedgerError>;

    /// Lists purchases matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] on backend failure.
    async fn list(&self, filter: &PurchaseFilter, page: Page) -> Result<PurchasePage, LedgerError>;

    /// References of pending purchases created before `cutoff`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] on backend failure.
    async fn stale_pending(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<RefId>, LedgerError>;

    /// Moves a pending purchase to success.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] or [`LedgerError::State`] when the
    /// purchase is not pending.
    async fn mark_success(
        &self,
        ref_id: &RefId,
        provider_ref_id: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<Purchase, LedgerError> {
        let lock = self
            .lock(ref_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(ref_id.clone()))?;
        lock.apply(StatusChange::Succeed {
            provider_ref_id: provider_ref_id.to_string(),
            paid_at,
        })
        .await
    }

    /// Moves a pending purchase to failed.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] or [`LedgerError::State`] when the
    /// purchase is not pending.
    async fn mark_failed(&self, ref_id: &RefId) -> Result<Purchase, LedgerError> {
        let lock = self
            .lock(ref_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(ref_id.clone()))?;
        lock.apply(StatusChange::Fail).await
    }

    /// Moves a successful purchase to refunded.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] or [`LedgerError::State`] when the
    /// purchase is not in success.
    async fn mark_refunded(&self, ref_id: &RefId) -> Result<Purchase, LedgerError> {
        let lock = self
            .lock(ref_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(ref_id.clone()))?;
        lock.apply(StatusChange::Refund).await
    }
}
