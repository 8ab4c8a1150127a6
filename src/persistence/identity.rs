//! Session lookups against the login service's tables.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{Customer, UserId};
use crate::identity::{IdentityError, IdentityProvider};

/// Resolves bearer tokens through `auth_sessions` joined with `users`.
#[derive(Debug, Clone)]
pub struct PgIdentity {
    pool: PgPool,
}

impl PgIdentity {
    /// Creates a resolver over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityProvider for PgIdentity {
    async fn resolve(&self, token: &str) -> Result<Option<Customer>, IdentityError> {
        let row = sqlx::query_as::<_, (i64, String)>(
            "SELECT u.id, u.phone_number FROM auth_sessions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.token = $1 AND s.expires_at > now() AND u.is_active",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, phone_number)| Customer {
            id: UserId(id),
            phone_number,
        }))
    }
}
