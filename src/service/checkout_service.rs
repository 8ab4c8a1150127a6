//! Checkout service: drives a purchase from start to callback.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::catalog::ContentCatalog;
use crate::domain::{
    CatalogItem, ContentType, Customer, EventBus, NewPurchase, Purchase, PurchaseEvent,
    PurchaseStatus, RefId, SiteSettings,
};
use crate::error::CheckoutError;
use crate::gateway::{GatewayError, PaymentGateway, PaymentRequest};
use crate::ledger::{
    LedgerError, Page, PurchaseFilter, PurchaseLedger, PurchaseLock, PurchasePage, StatusChange,
};

/// Provider status indicator meaning the buyer completed the payment page.
pub const PROVIDER_STATUS_OK: &str = "OK";

/// Upper bound on purchases closed by one sweep pass.
pub const SWEEP_BATCH: u32 = 500;

/// Where a started checkout sends the buyer next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A payment session was opened; send the buyer to the provider.
    Redirect {
        /// The pending purchase.
        ref_id: RefId,
        /// Provider payment page.
        redirect_url: String,
    },
    /// The buyer already owns the item.
    AlreadyOwned {
        /// Content page.
        destination: String,
    },
    /// The item costs nothing.
    Free {
        /// Content page.
        destination: String,
    },
}

/// Query parameters echoed back by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    /// Provider status indicator; `OK` means the buyer paid.
    pub status: Option<String>,
    /// Provider session token.
    pub authority: Option<String>,
}

/// Result of processing a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackOutcome {
    /// The purchase in its terminal state.
    pub purchase: Purchase,
    /// Buyer-facing summary.
    pub message: String,
    /// Content page, present when the purchase succeeded and the item
    /// still exists.
    pub content_url: Option<String>,
    /// `true` when the purchase was already terminal and nothing changed.
    pub replayed: bool,
}

impl CallbackOutcome {
    /// Whether the buyer now has access.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.purchase.status == PurchaseStatus::Success
    }
}

/// Why a pending purchase was closed as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailReason {
    Cancelled,
    MissingAuthority,
    AuthorityMismatch,
}

impl FailReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::MissingAuthority => "missing_authority",
            Self::AuthorityMismatch => "authority_mismatch",
        }
    }
}

/// Orchestration layer for checkout.
///
/// Owns no purchase state of its own: every decision is taken against the
/// ledger, and every status change is made under a [`PurchaseLock`] so that
/// the read of `pending` and the terminal write cannot interleave with
/// another callback for the same purchase.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    ledger: Arc<dyn PurchaseLedger>,
    catalog: Arc<dyn ContentCatalog>,
    gateway: Arc<dyn PaymentGateway>,
    event_bus: EventBus,
    public_base_url: String,
}

impl CheckoutService {
    /// Creates a new `CheckoutService`.
    ///
    /// `public_base_url` is the externally reachable origin used to build
    /// provider callback URLs.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn PurchaseLedger>,
        catalog: Arc<dyn ContentCatalog>,
        gateway: Arc<dyn PaymentGateway>,
        event_bus: EventBus,
        public_base_url: &str,
    ) -> Self {
        Self {
            ledger,
            catalog,
            gateway,
            event_bus,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Returns the ledger.
    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn PurchaseLedger> {
        &self.ledger
    }

    /// Absolute URL the provider redirects back to for `ref_id`.
    #[must_use]
    pub fn callback_url(&self, ref_id: &RefId) -> String {
        format!("{}/purchase/callback/{ref_id}", self.public_base_url)
    }

    async fn active_item(
        &self,
        content_type: ContentType,
        object_id: i64,
    ) -> Result<CatalogItem, CheckoutError> {
        let item = self
            .catalog
            .lookup(content_type, object_id)
            .await?
            .ok_or(CheckoutError::ContentNotFound {
                content_type,
                object_id,
            })?;
        if !item.is_active() {
            return Err(CheckoutError::ContentInactive {
                content_type,
                object_id,
            });
        }
        Ok(item)
    }

    /// Starts a checkout for `customer`.
    ///
    /// Owned and zero-price items short-circuit to the content page without
    /// creating a purchase or contacting the provider. Otherwise a pending
    /// purchase is created and a payment session opened for it.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::Maintenance`] while maintenance mode is on.
    /// - [`CheckoutError::ContentNotFound`] / [`CheckoutError::ContentInactive`].
    /// - [`CheckoutError::PaymentGateway`] when the session cannot be opened;
    ///   the purchase has been marked failed by then.
    pub async fn start(
        &self,
        customer: &Customer,
        content_type: ContentType,
        object_id: i64,
        settings: &SiteSettings,
    ) -> Result<StartOutcome, CheckoutError> {
        if settings.maintenance_mode {
            return Err(CheckoutError::Maintenance(
                settings.maintenance_message.clone(),
            ));
        }

        let item = self.active_item(content_type, object_id).await?;

        if self
            .ledger
            .has_access(Some(customer.id), content_type, object_id)
            .await?
        {
            tracing::info!(user_id = %customer.id, %content_type, object_id, "already owned");
            return Ok(StartOutcome::AlreadyOwned {
                destination: item.detail_url(),
            });
        }

        let amount = item.final_price();
        if amount.is_zero() {
            tracing::info!(user_id = %customer.id, %content_type, object_id, "free item");
            return Ok(StartOutcome::Free {
                destination: item.detail_url(),
            });
        }

        let purchase = self
            .ledger
            .create(NewPurchase {
                user_id: customer.id,
                content_type,
                object_id,
                amount,
            })
            .await?;
        let ref_id = purchase.ref_id.clone();
        let _ = self.event_bus.publish(PurchaseEvent::created(&purchase));
        tracing::info!(%ref_id, user_id = %customer.id, %content_type, object_id, %amount, "purchase created");

        let request = PaymentRequest {
            amount,
            description: format!("{} - {}", settings.site_name, item.description()),
            callback_url: self.callback_url(&ref_id),
            mobile: Some(customer.phone_number.clone()),
        };

        let session = match self.gateway.initiate(&request).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(%ref_id, kind = e.kind(), error = %e, "payment request failed");
                self.fail_pending(&ref_id, e.kind()).await;
                return Err(CheckoutError::PaymentGateway {
                    message: e.user_message(),
                    ref_id: Some(ref_id),
                    destination: Some(item.detail_url()),
                });
            }
        };

        if let Err(e) = self.ledger.attach_authority(&ref_id, &session.authority).await {
            tracing::error!(%ref_id, error = %e, "could not record authority");
            self.fail_pending(&ref_id, "authority_not_recorded").await;
            return Err(e.into());
        }
        let _ = self.event_bus.publish(PurchaseEvent::AuthorityAttached {
            ref_id: ref_id.clone(),
            authority: session.authority.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!(%ref_id, authority = %session.authority, "redirecting to provider");

        Ok(StartOutcome::Redirect {
            ref_id,
            redirect_url: session.redirect_url,
        })
    }

    /// Marks a purchase failed after an aborted start. Errors are logged:
    /// the caller is already reporting a failure of its own.
    async fn fail_pending(&self, ref_id: &RefId, reason: &str) {
        match self.ledger.mark_failed(ref_id).await {
            Ok(_) => {
                let _ = self.event_bus.publish(PurchaseEvent::PurchaseFailed {
                    ref_id: ref_id.clone(),
                    reason: reason.to_string(),
                    timestamp: Utc::now(),
                });
                tracing::info!(%ref_id, reason, "purchase failed");
            }
            Err(e) => tracing::error!(%ref_id, error = %e, "could not mark purchase failed"),
        }
    }

    /// Processes a provider callback for `ref_id`.
    ///
    /// Safe to call any number of times: a purchase that is already
    /// terminal is reported as-is, without contacting the provider.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::PurchaseNotFound`] for an unknown reference.
    /// - [`CheckoutError::Persistence`] when the ledger fails.
    pub async fn callback(
        &self,
        ref_id: &RefId,
        params: &CallbackParams,
    ) -> Result<CallbackOutcome, CheckoutError> {
        let lock = self
            .ledger
            .lock(ref_id)
            .await?
            .ok_or_else(|| CheckoutError::PurchaseNotFound(ref_id.to_string()))?;
        let current = lock.purchase().clone();

        if current.status.is_terminal() {
            drop(lock);
            tracing::info!(%ref_id, status = %current.status, "callback replayed");
            return Ok(self.outcome(current, None, true).await);
        }

        if params.status.as_deref().map(str::trim) != Some(PROVIDER_STATUS_OK) {
            return self.close_failed(lock, FailReason::Cancelled.as_str(), None).await;
        }

        let Some(authority) = current.authority.clone() else {
            return self
                .close_failed(lock, FailReason::MissingAuthority.as_str(), None)
                .await;
        };
        if params.authority.as_deref().map(str::trim) != Some(authority.as_str()) {
            tracing::warn!(%ref_id, "callback authority does not match the stored one");
            return self
                .close_failed(lock, FailReason::AuthorityMismatch.as_str(), None)
                .await;
        }

        match self.gateway.verify(&authority, current.amount).await {
            Ok(verification) => {
                let provider_ref_id = verification.provider_ref_id().to_string();
                let paid_at = Utc::now();
                let purchase = lock
                    .apply(StatusChange::Succeed {
                        provider_ref_id: provider_ref_id.clone(),
                        paid_at,
                    })
                    .await?;
                let _ = self.event_bus.publish(PurchaseEvent::PurchaseSucceeded {
                    ref_id: ref_id.clone(),
                    provider_ref_id: provider_ref_id.clone(),
                    timestamp: paid_at,
                });
                tracing::info!(%ref_id, %provider_ref_id, "purchase succeeded");
                Ok(self.outcome(purchase, None, false).await)
            }
            Err(e) => {
                tracing::warn!(%ref_id, kind = e.kind(), error = %e, "verification failed");
                self.close_failed(lock, e.kind(), Some(&e)).await
            }
        }
    }

    async fn close_failed(
        &self,
        lock: Box<dyn PurchaseLock>,
        reason: &str,
        gateway_error: Option<&GatewayError>,
    ) -> Result<CallbackOutcome, CheckoutError> {
        let purchase = lock.apply(StatusChange::Fail).await?;
        let _ = self.event_bus.publish(PurchaseEvent::PurchaseFailed {
            ref_id: purchase.ref_id.clone(),
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
        tracing::info!(ref_id = %purchase.ref_id, reason, "purchase failed");
        Ok(self.outcome(purchase, gateway_error, false).await)
    }

    async fn outcome(
        &self,
        purchase: Purchase,
        gateway_error: Option<&GatewayError>,
        replayed: bool,
    ) -> CallbackOutcome {
        let (message, content_url) = match purchase.status {
            PurchaseStatus::Success => (
                "Payment completed successfully.".to_string(),
                self.content_url(purchase.content_type, purchase.object_id)
                    .await,
            ),
            PurchaseStatus::Refunded => ("This payment has been refunded.".to_string(), None),
            PurchaseStatus::Failed | PurchaseStatus::Pending => {
                let message = match gateway_error {
                    Some(e) => format!(
                        "Payment was not completed: {}. Reference: {}",
                        e.user_message(),
                        purchase.ref_id
                    ),
                    None => format!("Payment was not completed. Reference: {}", purchase.ref_id),
                };
                (message, None)
            }
        };
        CallbackOutcome {
            purchase,
            message,
            content_url,
            replayed,
        }
    }

    async fn content_url(&self, content_type: ContentType, object_id: i64) -> Option<String> {
        match self.catalog.lookup(content_type, object_id).await {
            Ok(item) => item.map(|i| i.detail_url()),
            Err(e) => {
                tracing::warn!(%content_type, object_id, error = %e, "catalog lookup failed");
                None
            }
        }
    }

    /// Whether `customer` may open the item: open-access items are readable
    /// by anyone, everything else needs a successful purchase.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::ContentNotFound`] for an unknown item.
    pub async fn content_access(
        &self,
        customer: Option<&Customer>,
        content_type: ContentType,
        object_id: i64,
    ) -> Result<bool, CheckoutError> {
        let item = self
            .catalog
            .lookup(content_type, object_id)
            .await?
            .ok_or(CheckoutError::ContentNotFound {
                content_type,
                object_id,
            })?;
        if item.is_open_access() {
            return Ok(true);
        }
        Ok(self
            .ledger
            .has_access(customer.map(|c| c.id), content_type, object_id)
            .await?)
    }

    /// Purchases owned by `customer`, newest first.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Persistence`] when the ledger fails.
    pub async fn customer_purchases(
        &self,
        customer: &Customer,
        page: Page,
    ) -> Result<PurchasePage, CheckoutError> {
        let filter = PurchaseFilter {
            user_id: Some(customer.id),
            ..PurchaseFilter::default()
        };
        Ok(self.ledger.list(&filter, page).await?)
    }

    /// Administrative listing.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Persistence`] when the ledger fails.
    pub async fn list_purchases(
        &self,
        filter: &PurchaseFilter,
        page: Page,
    ) -> Result<PurchasePage, CheckoutError> {
        Ok(self.ledger.list(filter, page).await?)
    }

    /// Looks up one purchase.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::PurchaseNotFound`] for an unknown reference.
    pub async fn get_purchase(&self, ref_id: &RefId) -> Result<Purchase, CheckoutError> {
        self.ledger
            .get(ref_id)
            .await?
            .ok_or_else(|| CheckoutError::PurchaseNotFound(ref_id.to_string()))
    }

    /// Refunds a successful purchase, revoking access.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::PurchaseNotFound`] for an unknown reference.
    /// - [`CheckoutError::InvalidTransition`] unless the purchase is in
    ///   success.
    pub async fn refund(&self, ref_id: &RefId) -> Result<Purchase, CheckoutError> {
        let purchase = self.ledger.mark_refunded(ref_id).await?;
        let _ = self.event_bus.publish(PurchaseEvent::PurchaseRefunded {
            ref_id: ref_id.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!(%ref_id, "purchase refunded");
        Ok(purchase)
    }

    /// Closes pending purchases created before `cutoff` as failed.
    ///
    /// Each purchase is re-checked under its lock, so a callback that
    /// lands during the sweep wins or loses cleanly.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Persistence`] when the stale set cannot be read.
    /// Failures on individual purchases are logged and skipped.
    pub async fn expire_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<RefId>, CheckoutError> {
        let candidates = self.ledger.stale_pending(cutoff, SWEEP_BATCH).await?;
        let mut expired = Vec::with_capacity(candidates.len());
        for ref_id in candidates {
            match self.expire_one(&ref_id, cutoff).await {
                Ok(true) => expired.push(ref_id),
                Ok(false) => {}
                Err(e) => tracing::warn!(%ref_id, error = %e, "could not expire purchase"),
            }
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "expired stale pending purchases");
        }
        Ok(expired)
    }

    async fn expire_one(&self, ref_id: &RefId, cutoff: DateTime<Utc>) -> Result<bool, LedgerError> {
        let Some(lock) = self.ledger.lock(ref_id).await? else {
            return Ok(false);
        };
        let current = lock.purchase();
        if current.status != PurchaseStatus::Pending || current.created_at >= cutoff {
            return Ok(false);
        }
        lock.apply(StatusChange::Fail).await?;
        let _ = self.event_bus.publish(PurchaseEvent::PurchaseExpired {
            ref_id: ref_id.clone(),
            timestamp: Utc::now(),
        });
        Ok(true)
    }
}
