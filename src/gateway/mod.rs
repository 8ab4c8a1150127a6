//! Payment gateway client.
//!
//! [`PaymentGateway`] is the stateless seam between the checkout service
//! and the payment provider: one call opens a payment session, one call
//! confirms it. Neither call retries.

pub mod error;
pub mod wire;
pub mod zarinpal;

use std::fmt;

use async_trait::async_trait;

use crate::domain::Amount;

pub use error::GatewayError;
pub use zarinpal::{ZarinpalClient, ZarinpalConfig, ZarinpalEndpoints};

/// Input for [`PaymentGateway::initiate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    /// Amount in Toman; converted to Rial by the client.
    pub amount: Amount,
    /// Description shown on the provider's payment page.
    pub description: String,
    /// Absolute URL the provider sends the buyer back to.
    pub callback_url: String,
    /// Buyer phone number, if known.
    pub mobile: Option<String>,
}

/// An opened payment session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    /// Provider session token.
    pub authority: String,
    /// Provider page the buyer must be sent to.
    pub redirect_url: String,
}

/// Successful verification outcome.
///
/// The provider distinguishes a first confirmation from a repeated one;
/// both mean the money was received and carry the same receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// First confirmation of this payment.
    Verified {
        /// Provider receipt id.
        provider_ref_id: String,
    },
    /// The payment had already been confirmed by an earlier call.
    AlreadyVerified {
        /// Provider receipt id.
        provider_ref_id: String,
    },
}

impl Verification {
    /// Provider receipt id, whichever variant.
    #[must_use]
    pub fn provider_ref_id(&self) -> &str {
        match self {
            Self::Verified { provider_ref_id } | Self::AlreadyVerified { provider_ref_id } => {
                provider_ref_id
            }
        }
    }
}

/// Outbound contract with the payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync + fmt::Debug {
    /// Opens a payment session.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] on a provider rejection, transport failure,
    /// or a request that cannot be sent (non-absolute callback URL).
    async fn initiate(&self, request: &PaymentRequest) -> Result<PaymentSession, GatewayError>;

    /// Confirms a payment session for the given amount.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] for any outcome other than verified or
    /// already verified.
    async fn verify(&self, authority: &str, amount: Amount) -> Result<Verification, GatewayError>;
}
