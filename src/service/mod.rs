//! Service layer: checkout orchestration.
//!
//! [`CheckoutService`] coordinates the ledger, the catalog, and the
//! payment gateway, and emits events through the
//! [`super::domain::EventBus`].

pub mod checkout_service;
pub mod sweeper;

pub use checkout_service::{CallbackOutcome, CallbackParams, CheckoutService, StartOutcome};
pub use sweeper::spawn_sweeper;
