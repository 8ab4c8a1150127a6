//! In-memory purchase ledger with per-purchase locking.
//!
//! Entries live in a `HashMap`. Each entry pairs the committed purchase,
//! behind a [`tokio::sync::RwLock`], with a claim [`tokio::sync::Mutex`].
//! A [`PurchaseLock`] owns the claim guard, so writers to the same purchase
//! are serialized while different purchases proceed independently. Readers
//! only touch the committed value and never wait for a claim holder.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::{
    LedgerError, Page, PurchaseFilter, PurchaseLedger, PurchaseLock, PurchasePage, StatusChange,
};
use crate::domain::{ContentType, NewPurchase, Purchase, PurchaseStatus, RefId, UserId};

/// One stored purchase.
#[derive(Debug)]
struct Entry {
    /// Held by the writer deciding the next transition.
    claim: Arc<Mutex<()>>,
    /// Last committed state.
    current: Arc<RwLock<Purchase>>,
}

impl Entry {
    fn new(purchase: Purchase) -> Arc<Self> {
        Arc::new(Self {
            claim: Arc::new(Mutex::new(())),
            current: Arc::new(RwLock::new(purchase)),
        })
    }

    async fn read(&self) -> Purchase {
        self.current.read().await.clone()
    }
}

/// Process-local ledger used for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    purchases: RwLock<HashMap<RefId, Arc<Entry>>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored purchases.
    pub async fn len(&self) -> usize {
        self.purchases.read().await.len()
    }

    /// Returns `true` if no purchase has been stored.
    pub async fn is_empty(&self) -> bool {
        self.purchases.read().await.is_empty()
    }

    /// Inserts a purchase as-is, keeping its reference and status.
    ///
    /// Used to seed fixtures; the checkout flow always goes through
    /// [`PurchaseLedger::create`].
    pub async fn insert(&self, purchase: Purchase) {
        self.purchases
            .write()
            .await
            .insert(purchase.ref_id.clone(), Entry::new(purchase));
    }

    async fn entry(&self, ref_id: &RefId) -> Option<Arc<Entry>> {
        self.purchases.read().await.get(ref_id).map(Arc::clone)
    }

    /// Copies every committed purchase out.
    async fn snapshot(&self) -> Vec<Purchase> {
        let entries: Vec<Arc<Entry>> = self.purchases.read().await.values().map(Arc::clone).collect();
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            out.push(entry.read().await);
        }
        out
    }
}

#[async_trait]
impl PurchaseLedger for InMemoryLedger {
    async fn create(&self, new: NewPurchase) -> Result<Purchase, LedgerError> {
        let mut map = self.purchases.write().await;
        let mut purchase = Purchase::new(new.clone(), Utc::now());
        while map.contains_key(&purchase.ref_id) {
            purchase = Purchase::new(new.clone(), purchase.created_at);
        }
        map.insert(purchase.ref_id.clone(), Entry::new(purchase.clone()));
        Ok(purchase)
    }

    async fn get(&self, ref_id: &RefId) -> Result<Option<Purchase>, LedgerError> {
        match self.entry(ref_id).await {
            Some(entry) => Ok(Some(entry.read().await)),
            None => Ok(None),
        }
    }

    async fn attach_authority(
        &self,
        ref_id: &RefId,
        authority: &str,
    ) -> Result<Purchase, LedgerError> {
        let entry = self
            .entry(ref_id)
            .await
            .ok_or_else(|| LedgerError::NotFound(ref_id.clone()))?;
        let _claim = entry.claim.lock().await;
        let mut purchase = entry.current.write().await;
        purchase.attach_authority(authority)?;
        Ok(purchase.clone())
    }

    async fn lock(&self, ref_id: &RefId) -> Result<Option<Box<dyn PurchaseLock>>, LedgerError> {
        let Some(entry) = self.entry(ref_id).await else {
            return Ok(None);
        };
        let claim = Arc::clone(&entry.claim).lock_owned().await;
        let purchase = entry.read().await;
        Ok(Some(Box::new(MemoryPurchaseLock {
            _claim: claim,
            current: Arc::clone(&entry.current),
            purchase,
        })))
    }

    async fn has_access(
        &self,
        user: Option<UserId>,
        content_type: ContentType,
        object_id: i64,
    ) -> Result<bool, LedgerError> {
        let Some(user) = user else {
            return Ok(false);
        };
        Ok(self.snapshot().await.iter().any(|p| {
            p.user_id == Some(user)
                && p.content_type == content_type
                && p.object_id == object_id
                && p.status == PurchaseStatus::Success
        }))
    }

    async fn list(&self, filter: &PurchaseFilter, page: Page) -> Result<PurchasePage, LedgerError> {
        let mut matched: Vec<Purchase> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect();
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.ref_id.as_str().cmp(b.ref_id.as_str()))
        });
        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.per_page as usize)
            .collect();
        Ok(PurchasePage { items, total })
    }

    async fn stale_pending(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<RefId>, LedgerError> {
        let mut stale: Vec<Purchase> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|p| p.status == PurchaseStatus::Pending && p.created_at < cutoff)
            .collect();
        stale.sort_by_key(|p| p.created_at);
        Ok(stale
            .into_iter()
            .take(limit as usize)
            .map(|p| p.ref_id)
            .collect())
    }
}

#[derive(Debug)]
struct MemoryPurchaseLock {
    _claim: OwnedMutexGuard<()>,
    current: Arc<RwLock<Purchase>>,
    purchase: Purchase,
}

#[async_trait]
impl PurchaseLock for MemoryPurchaseLock {
    fn purchase(&self) -> &Purchase {
        &self.purchase
    }

    async fn apply(self: Box<Self>, change: StatusChange) -> Result<Purchase, LedgerError> {
        let mut updated = self.purchase.clone();
        change.apply_to(&mut updated)?;
        *self.current.write().await = updated.clone();
        Ok(updated)
    }
}
