//! PostgreSQL implementation of the purchase ledger.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use super::models::{
    PURCHASE_COLUMNS, PURCHASE_COLUMNS_P, PurchaseRow, amount_column, purchase_from_row,
};
use crate::domain::{ContentType, NewPurchase, Purchase, RefId, UserId};
use crate::ledger::{
    LedgerError, Page, PurchaseFilter, PurchaseLedger, PurchaseLock, PurchasePage, StatusChange,
};

/// Attempts at drawing a ref id that is not already taken.
const CREATE_ATTEMPTS: usize = 3;

/// PostgreSQL-backed ledger using `sqlx::PgPool`.
///
/// [`PurchaseLedger::lock`] opens a transaction and takes a row lock with
/// `SELECT … FOR UPDATE`; the lock is released when the transaction
/// commits in [`PurchaseLock::apply`] or rolls back on drop.
#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    /// Creates a ledger over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &PurchaseFilter) {
    if let Some(user_id) = filter.user_id {
        qb.push(" AND p.user_id = ").push_bind(user_id.0);
    }
    if let Some(status) = filter.status {
        qb.push(" AND p.status = ").push_bind(status.as_str());
    }
    if let Some(content_type) = filter.content_type {
        qb.push(" AND p.content_type = ").push_bind(content_type.as_str());
    }
    if let Some(term) = filter.search.as_deref().map(str::trim)
        && !term.is_empty()
    {
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" AND (p.ref_id ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.authority ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.provider_ref_id ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.phone_number ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl PurchaseLedger for PgLedger {
    async fn create(&self, new: NewPurchase) -> Result<Purchase, LedgerError> {
        let amount = amount_column(new.amount)?;
        let sql = format!(
            "INSERT INTO purchases (ref_id, user_id, content_type, object_id, amount, status) \
             VALUES ($1, $2, $3, $4, $5, 'pending') RETURNING {PURCHASE_COLUMNS}"
        );
        for _ in 0..CREATE_ATTEMPTS {
            let ref_id = RefId::new();
            let result = sqlx::query_as::<_, PurchaseRow>(&sql)
                .bind(ref_id.as_str())
                .bind(new.user_id.0)
                .bind(new.content_type.as_str())
                .bind(new.object_id)
                .bind(amount)
                .fetch_one(&self.pool)
                .await;
            match result {
                Ok(row) => return purchase_from_row(row),
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    tracing::warn!(%ref_id, "ref id collision, drawing another");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(LedgerError::Storage(
            "could not allocate a unique ref id".to_string(),
        ))
    }

    async fn get(&self, ref_id: &RefId) -> Result<Option<Purchase>, LedgerError> {
        let sql = format!("SELECT {PURCHASE_COLUMNS} FROM purchases WHERE ref_id = $1");
        sqlx::query_as::<_, PurchaseRow>(&sql)
            .bind(ref_id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(purchase_from_row)
            .transpose()
    }

    async fn attach_authority(
        &self,
        ref_id: &RefId,
        authority: &str,
    ) -> Result<Purchase, LedgerError> {
        let sql = format!(
            "UPDATE purchases SET authority = $2 \
             WHERE ref_id = $1 AND status = 'pending' AND authority IS NULL \
             RETURNING {PURCHASE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PurchaseRow>(&sql)
            .bind(ref_id.as_str())
            .bind(authority)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(row) = row {
            return purchase_from_row(row);
        }

        // Nothing updated: report why using the status machine.
        let mut current = self
            .get(ref_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(ref_id.clone()))?;
        current.attach_authority(authority)?;
        Err(LedgerError::Conflict(ref_id.clone()))
    }

    async fn lock(&self, ref_id: &RefId) -> Result<Option<Box<dyn PurchaseLock>>, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("SELECT {PURCHASE_COLUMNS} FROM purchases WHERE ref_id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, PurchaseRow>(&sql)
            .bind(ref_id.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let purchase = purchase_from_row(row)?;
        Ok(Some(Box::new(PgPurchaseLock { tx, purchase })))
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
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM purchases \
             WHERE user_id = $1 AND content_type = $2 AND object_id = $3 AND status = 'success')",
        )
        .bind(user.0)
        .bind(content_type.as_str())
        .bind(object_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list(&self, filter: &PurchaseFilter, page: Page) -> Result<PurchasePage, LedgerError> {
        const FROM: &str = " FROM purchases p LEFT JOIN users u ON u.id = p.user_id WHERE TRUE";

        let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*){FROM}"));
        push_filter(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {PURCHASE_COLUMNS_P}{FROM}"));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY p.created_at DESC, p.ref_id ASC LIMIT ")
            .push_bind(i64::from(page.per_page))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
        let rows = select.build_query_as::<PurchaseRow>().fetch_all(&self.pool).await?;

        Ok(PurchasePage {
            items: rows
                .into_iter()
                .map(purchase_from_row)
                .collect::<Result<_, _>>()?,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn stale_pending(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<RefId>, LedgerError> {
        let refs = sqlx::query_scalar::<_, String>(
            "SELECT ref_id FROM purchases WHERE status = 'pending' AND created_at < $1 \
             ORDER BY created_at ASC LIMIT $2",
        )
        .bind(cutoff)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        refs.iter()
            .map(|r| {
                r.parse::<RefId>()
                    .map_err(|e| LedgerError::Storage(e.to_string()))
            })
            .collect()
    }
}

/// Row lock held by an open transaction.
struct PgPurchaseLock {
    tx: Transaction<'static, Postgres>,
    purchase: Purchase,
}

impl fmt::Debug for PgPurchaseLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgPurchaseLock")
            .field("purchase", &self.purchase)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PurchaseLock for PgPurchaseLock {
    fn purchase(&self) -> &Purchase {
        &self.purchase
    }

    async fn apply(self: Box<Self>, change: StatusChange) -> Result<Purchase, LedgerError> {
        let Self { mut tx, purchase } = *self;
        let mut updated = purchase.clone();
        change.apply_to(&mut updated)?;

        let sql = format!(
            "UPDATE purchases SET status = $2, provider_ref_id = $3, paid_at = $4 \
             WHERE ref_id = $1 AND status = $5 RETURNING {PURCHASE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PurchaseRow>(&sql)
            .bind(updated.ref_id.as_str())
            .bind(updated.status.as_str())
            .bind(updated.provider_ref_id.as_deref())
            .bind(updated.paid_at)
            .bind(purchase.status.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Err(LedgerError::Conflict(purchase.ref_id));
        };
        tx.commit().await?;

        purchase_from_row(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PurchaseStatus;

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("09_12%"), "09\\_12\\%");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("ABC"), "ABC");
    }

    #[test]
    fn filter_sql_binds_every_field() {
        let filter = PurchaseFilter {
            user_id: Some(UserId(3)),
            status: Some(PurchaseStatus::Success),
            content_type: Some(ContentType::Book),
            search: Some(" 0912 ".to_string()),
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM purchases p WHERE TRUE");
        push_filter(&mut qb, &filter);
        let sql = qb.sql();
        assert!(sql.contains("p.user_id = $1"));
        assert!(sql.contains("p.status = $2"));
        assert!(sql.contains("p.content_type = $3"));
        assert!(sql.contains("u.phone_number ILIKE $7"));
    }

    #[test]
    fn blank_search_adds_nothing() {
        let filter = PurchaseFilter {
            search: Some("   ".to_string()),
            ..PurchaseFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 WHERE TRUE");
        push_filter(&mut qb, &filter);
        assert_eq!(qb.sql(), "SELECT 1 WHERE TRUE");
    }
}
