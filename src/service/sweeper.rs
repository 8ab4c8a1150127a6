//! Periodic expiry of abandoned pending purchases.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use super::CheckoutService;

/// Spawns a task that calls [`CheckoutService::expire_stale`] every
/// `interval`, closing purchases pending for longer than `max_age`.
pub fn spawn_sweeper(
    service: Arc<CheckoutService>,
    max_age: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let cutoff = Utc::now()
                .checked_sub_signed(max_age)
                .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
            if let Err(e) = service.expire_stale(cutoff).await {
                tracing::error!(error = %e, "pending sweep failed");
            }
        }
    })
}
