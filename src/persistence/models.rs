//! Row shapes for the `purchases` table and their domain conversion.

use chrono::{DateTime, Utc};

use crate::domain::{Amount, ContentType, Purchase, PurchaseStatus, RefId, UserId};
use crate::ledger::LedgerError;

/// Column list shared by every query returning a [`PurchaseRow`].
pub const PURCHASE_COLUMNS: &str = "ref_id, user_id, content_type, object_id, amount, \
     authority, provider_ref_id, status, created_at, paid_at";

/// Same columns qualified with the `p` alias used by joined queries.
pub const PURCHASE_COLUMNS_P: &str = "p.ref_id, p.user_id, p.content_type, p.object_id, \
     p.amount, p.authority, p.provider_ref_id, p.status, p.created_at, p.paid_at";

/// A raw `purchases` row, in [`PURCHASE_COLUMNS`] order.
pub type PurchaseRow = (
    String,
    Option<i64>,
    String,
    i64,
    i64,
    Option<String>,
    Option<String>,
    String,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

/// Decodes a row into a [`Purchase`].
///
/// # Errors
///
/// Returns [`LedgerError::Storage`] when a column holds a value the domain
/// does not accept (malformed ref id, unknown status, negative amount).
pub fn purchase_from_row(row: PurchaseRow) -> Result<Purchase, LedgerError> {
    let (
        ref_id,
        user_id,
        content_type,
        object_id,
        amount,
        authority,
        provider_ref_id,
        status,
        created_at,
        paid_at,
    ) = row;

    let storage = |what: &str, e: String| LedgerError::Storage(format!("bad {what} column: {e}"));
    Ok(Purchase {
        ref_id: ref_id
            .parse::<RefId>()
            .map_err(|e| storage("ref_id", e.to_string()))?,
        user_id: user_id.map(UserId),
        content_type: content_type
            .parse::<ContentType>()
            .map_err(|e| storage("content_type", e.to_string()))?,
        object_id,
        amount: u64::try_from(amount)
            .map(Amount::new)
            .map_err(|e| storage("amount", e.to_string()))?,
        authority,
        provider_ref_id,
        status: status
            .parse::<PurchaseStatus>()
            .map_err(|e| storage("status", e))?,
        created_at,
        paid_at,
    })
}

/// Converts an amount to the `BIGINT` column type.
///
/// # Errors
///
/// Returns [`LedgerError::Storage`] when the amount exceeds `i64::MAX`.
pub fn amount_column(amount: Amount) -> Result<i64, LedgerError> {
    i64::try_from(amount.toman())
        .map_err(|_| LedgerError::Storage(format!("amount {amount} does not fit the column")))
}
