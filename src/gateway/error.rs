//! Payment provider errors.

/// Message used when the provider rejects a call without explaining why.
pub const UNSPECIFIED_REJECTION: &str = "payment provider returned an unspecified error";

/// Failure of a single provider call. Never retried by the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The provider answered with a non-success code.
    #[error("payment rejected by provider (code {code:?}): {message}")]
    Rejected {
        /// Provider status code, when present.
        code: Option<i64>,
        /// Provider message, or [`UNSPECIFIED_REJECTION`].
        message: String,
    },

    /// The call did not complete: connection failure or timeout.
    #[error("payment provider unreachable: {0}")]
    Transport(String),

    /// The provider answered with something that is not its JSON envelope.
    #[error("unexpected payment provider response: {0}")]
    InvalidResponse(String),

    /// The request was refused locally before any network call.
    #[error("invalid payment request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// Message suitable for showing to the buyer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::Transport(_) | Self::InvalidResponse(_) => {
                "could not reach the payment provider".to_string()
            }
            Self::InvalidRequest(msg) => msg.clone(),
        }
    }

    /// Short machine-readable label for logs and audit events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "gateway_rejected",
            Self::Transport(_) => "gateway_unreachable",
            Self::InvalidResponse(_) => "gateway_bad_response",
            Self::InvalidRequest(_) => "gateway_invalid_request",
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Transport(format!("timed out: {e}"))
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}
