//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::SiteSettings;
use crate::identity::IdentityProvider;
use crate::service::CheckoutService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Checkout service for all business logic.
    pub checkout: Arc<CheckoutService>,
    /// Bearer token resolution.
    pub identity: Arc<dyn IdentityProvider>,
    /// Site settings loaded at startup.
    pub settings: Arc<SiteSettings>,
    /// Administrative shared secret; `None` disables the admin routes.
    pub admin_token: Option<Arc<str>>,
}
