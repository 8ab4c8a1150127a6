//! Append-only audit log of purchase events.

use sqlx::PgPool;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::domain::PurchaseEvent;
use crate::ledger::LedgerError;

/// Writes [`PurchaseEvent`]s to the `purchase_events` table.
#[derive(Debug, Clone)]
pub struct PgEventLog {
    pool: PgPool,
}

impl PgEventLog {
    /// Creates an event log over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends an event to the log and returns its row id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] on database or encoding failure.
    pub async fn save_event(&self, event: &PurchaseEvent) -> Result<i64, LedgerError> {
        let payload =
            serde_json::to_value(event).map_err(|e| LedgerError::Storage(e.to_string()))?;
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO purchase_events (ref_id, event_type, payload) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(event.ref_id().as_str())
        .bind(event.event_type_str())
        .bind(payload)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Drains `events` into the log until the bus closes.
    pub fn spawn(self, mut events: Receiver<PurchaseEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let Err(e) = self.save_event(&event).await {
                            tracing::error!(
                                ref_id = %event.ref_id(),
                                event_type = event.event_type_str(),
                                error = %e,
                                "failed to append purchase event"
                            );
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event log fell behind, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
