//! Session-token to customer resolution.
//!
//! Login (phone number + one-time code) lives in a separate service that
//! issues opaque session tokens. This module only turns such a token back
//! into the [`Customer`] it belongs to.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::Customer;

/// Identity lookup failure.
#[derive(Debug, thiserror::Error)]
#[error("identity store unavailable: {0}")]
pub struct IdentityError(pub String);

impl From<sqlx::Error> for IdentityError {
    fn from(e: sqlx::Error) -> Self {
        Self(e.to_string())
    }
}

/// Resolves session tokens.
#[async_trait]
pub trait IdentityProvider: Send + Sync + fmt::Debug {
    /// Returns the customer owning a live session, or `None` for an
    /// unknown or expired token.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] when the session store cannot be read.
    async fn resolve(&self, token: &str) -> Result<Option<Customer>, IdentityError>;
}

/// Fixed token table; used for local development and tests.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    sessions: RwLock<HashMap<String, Customer>>,
}

impl StaticIdentity {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token for a customer.
    pub async fn insert(&self, token: impl Into<String>, customer: Customer) {
        self.sessions.write().await.insert(token.into(), customer);
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn resolve(&self, token: &str) -> Result<Option<Customer>, IdentityError> {
        Ok(self.sessions.read().await.get(token).cloned())
    }
}
