//! Domain layer: purchases, catalog items, identities, and events.
//!
//! This module contains the server-side domain model including the
//! purchase status machine, the closed set of content kinds, the event
//! bus for broadcasting purchase changes, and the site settings value.

pub mod amount;
pub mod content;
pub mod customer;
pub mod event_bus;
pub mod purchase;
pub mod purchase_event;
pub mod ref_id;
pub mod site_settings;

pub use amount::Amount;
pub use content::{AccessType, CatalogItem, ContentType, Listing};
pub use customer::{Customer, UserId};
pub use event_bus::EventBus;
pub use purchase::{NewPurchase, Purchase, PurchaseStateError, PurchaseStatus};
pub use purchase_event::PurchaseEvent;
pub use ref_id::RefId;
pub use site_settings::SiteSettings;
