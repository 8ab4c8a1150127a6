//! Authenticated buyer identity.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Primary key of a platform user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A signed-in user as resolved from their session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// User primary key.
    pub id: UserId,
    /// Login phone number; forwarded to the gateway as contact metadata.
    pub phone_number: String,
}
