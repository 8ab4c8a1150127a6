//! Externally shareable purchase reference.
//!
//! [`RefId`] is the human-readable order code printed on receipts and
//! embedded in the provider callback URL. It is 16 upper-case hexadecimal
//! characters taken from a random UUID v4.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Length of a reference code in characters.
pub const REF_ID_LEN: usize = 16;

/// Unique order code of a purchase.
///
/// Generated once when the purchase is created and never reassigned.
/// Used as the primary lookup key by the ledger, the callback route, and
/// the administrative search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "3F2A9C01B7D44E1A")]
pub struct RefId(String);

impl RefId {
    /// Creates a new random `RefId`.
    #[must_use]
    pub fn new() -> Self {
        let simple = uuid::Uuid::new_v4().simple().to_string().to_ascii_uppercase();
        Self(simple.chars().take(REF_ID_LEN).collect())
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RefId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when a string is not a well-formed reference code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed reference id: {0:?}")]
pub struct MalformedRefId(pub String);

impl FromStr for RefId {
    type Err = MalformedRefId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let well_formed = s.len() == REF_ID_LEN
            && s.chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c));
        if well_formed {
            Ok(Self(s.to_string()))
        } else {
            Err(MalformedRefId(s.to_string()))
        }
    }
}

impl TryFrom<String> for RefId {
    type Error = MalformedRefId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RefId> for String {
    fn from(id: RefId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn new_is_sixteen_upper_hex() {
        let id = RefId::new();
        assert_eq!(id.as_str().len(), REF_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id.as_str(), id.as_str().to_ascii_uppercase());
    }

    #[test]
    fn generated_ids_are_distinct() {
        let ids: HashSet<RefId> = (0..10_000).map(|_| RefId::new()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn parse_accepts_generated_ids() {
        let id = RefId::new();
        let Ok(parsed) = id.as_str().parse::<RefId>() else {
            panic!("generated id must parse");
        };
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!("".parse::<RefId>().is_err());
        assert!("3f2a9c01b7d44e1a".parse::<RefId>().is_err());
        assert!("3F2A9C01B7D44E1".parse::<RefId>().is_err());
        assert!("3F2A9C01B7D44E1AZ".parse::<RefId>().is_err());
        assert!("../../etc/passwd".parse::<RefId>().is_err());
    }

    #[test]
    fn deserialize_validates() {
        let ok: Result<RefId, _> = serde_json::from_str("\"0123456789ABCDEF\"");
        assert!(ok.is_ok());
        let bad: Result<RefId, _> = serde_json::from_str("\"nope\"");
        assert!(bad.is_err());
    }
}
