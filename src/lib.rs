//! # media-checkout
//!
//! Purchase and payment service for a media platform selling books,
//! podcasts, and courses through the Zarinpal payment gateway.
//!
//! A checkout creates a pending purchase, opens a payment session with the
//! provider, and redirects the buyer there. The provider later redirects
//! the buyer back to the callback endpoint, where the purchase is verified
//! and settled exactly once, however many times the callback arrives.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP), payment provider redirects
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── CheckoutService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── PurchaseLedger (ledger/)     ContentCatalog (catalog)
//!     ├── PaymentGateway (gateway/)    IdentityProvider (identity)
//!     │
//!     └── PostgreSQL Persistence (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod ledger;
pub mod persistence;
pub mod service;
