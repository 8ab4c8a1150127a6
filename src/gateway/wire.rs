//! Zarinpal REST v4 request and response bodies.
//!
//! The provider wraps every answer in `{"data": ..., "errors": ...}`. On
//! success `errors` is an empty array; on failure `data` is. Both sides
//! are therefore decoded through [`Section`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Code returned for a successful request or first verification.
pub const CODE_SUCCESS: i64 = 100;

/// Code returned when the payment was already verified earlier.
pub const CODE_ALREADY_VERIFIED: i64 = 101;

/// Body of `POST /pg/v4/payment/request.json`.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequestBody<'a> {
    /// Merchant identifier.
    pub merchant_id: &'a str,
    /// Amount in Rial.
    pub amount: u64,
    /// Free-text description shown on the payment page.
    pub description: &'a str,
    /// Absolute URL the provider redirects back to.
    pub callback_url: &'a str,
    /// Optional buyer contact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata<'a>>,
}

/// Buyer contact metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Metadata<'a> {
    /// Buyer mobile number.
    pub mobile: &'a str,
}

/// Body of `POST /pg/v4/payment/verify.json`.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyRequestBody<'a> {
    /// Merchant identifier.
    pub merchant_id: &'a str,
    /// Amount in Rial; must equal the amount sent at request time.
    pub amount: u64,
    /// Authority issued at request time.
    pub authority: &'a str,
}

/// `data` section of a payment request answer.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequestData {
    /// Provider status code.
    pub code: i64,
    /// Payment session token.
    #[serde(default)]
    pub authority: Option<String>,
}

/// `data` section of a verification answer.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyData {
    /// Provider status code.
    pub code: i64,
    /// Receipt id; numeric in practice.
    #[serde(default)]
    pub ref_id: Option<serde_json::Value>,
}

impl VerifyData {
    /// Receipt id rendered as a string.
    #[must_use]
    pub fn ref_id_string(&self) -> Option<String> {
        match self.ref_id.as_ref()? {
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

/// `errors` section of a failed answer.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderErrors {
    /// Provider error code.
    #[serde(default)]
    pub code: Option<i64>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

/// Either a populated object or the provider's empty-array placeholder.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Section<T> {
    /// Populated object.
    Object(T),
    /// Anything else (`[]`, `null`).
    Other(serde_json::Value),
}

impl<T> Default for Section<T> {
    fn default() -> Self {
        Self::Other(serde_json::Value::Null)
    }
}

impl<T> Section<T> {
    /// Returns the populated object, if any.
    pub fn into_object(self) -> Option<T> {
        match self {
            Self::Object(v) => Some(v),
            Self::Other(_) => None,
        }
    }
}

/// Full response envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
pub struct Envelope<T> {
    /// Success payload.
    #[serde(default)]
    pub data: Section<T>,
    /// Failure payload.
    #[serde(default)]
    pub errors: Section<ProviderErrors>,
}
