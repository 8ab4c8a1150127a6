//! Persistence layer: PostgreSQL ledger, catalog, sessions, and audit log.
//!
//! Every store here implements the same trait as its in-memory
//! counterpart, so the service layer is agnostic of the backend. Schema
//! changes live in `migrations/` and are applied at startup.

pub mod catalog;
pub mod event_log;
pub mod identity;
pub mod models;
pub mod postgres;
pub mod settings;

pub use catalog::PgCatalog;
pub use event_log::PgEventLog;
pub use identity::PgIdentity;
pub use postgres::PgLedger;
pub use settings::load_site_settings;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
