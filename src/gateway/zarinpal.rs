//! Zarinpal REST v4 client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use super::error::UNSPECIFIED_REJECTION;
use super::wire::{
    CODE_ALREADY_VERIFIED, CODE_SUCCESS, Envelope, Metadata, PaymentRequestBody,
    PaymentRequestData, ProviderErrors, VerifyData, VerifyRequestBody,
};
use super::{GatewayError, PaymentGateway, PaymentRequest, PaymentSession, Verification};
use crate::domain::Amount;

const SANDBOX_API: &str = "https://sandbox.zarinpal.com";
const PRODUCTION_API: &str = "https://api.zarinpal.com";
const PRODUCTION_START_PAY: &str = "https://www.zarinpal.com";

/// Provider URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZarinpalEndpoints {
    /// Payment request endpoint.
    pub request_url: String,
    /// Verification endpoint.
    pub verify_url: String,
    /// Payment page prefix; the authority is appended.
    pub start_pay_url: String,
}

impl ZarinpalEndpoints {
    /// Sandbox endpoints.
    #[must_use]
    pub fn sandbox() -> Self {
        Self::with_hosts(SANDBOX_API, SANDBOX_API)
    }

    /// Production endpoints.
    #[must_use]
    pub fn production() -> Self {
        Self::with_hosts(PRODUCTION_API, PRODUCTION_START_PAY)
    }

    /// Endpoints rooted at arbitrary hosts (for staging proxies and tests).
    #[must_use]
    pub fn with_hosts(api_base: &str, start_pay_base: &str) -> Self {
        let api_base = api_base.trim_end_matches('/');
        let start_pay_base = start_pay_base.trim_end_matches('/');
        Self {
            request_url: format!("{api_base}/pg/v4/payment/request.json"),
            verify_url: format!("{api_base}/pg/v4/payment/verify.json"),
            start_pay_url: format!("{start_pay_base}/pg/StartPay/"),
        }
    }

    fn redirect_url(&self, authority: &str) -> String {
        format!("{}{authority}", self.start_pay_url)
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ZarinpalConfig {
    /// Merchant identifier issued by Zarinpal.
    pub merchant_id: String,
    /// Provider URLs.
    pub endpoints: ZarinpalEndpoints,
    /// Per-call timeout.
    pub timeout: Duration,
}

impl ZarinpalConfig {
    /// Configuration for the sandbox or production environment.
    #[must_use]
    pub fn new(merchant_id: impl Into<String>, sandbox: bool, timeout: Duration) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            endpoints: if sandbox {
                ZarinpalEndpoints::sandbox()
            } else {
                ZarinpalEndpoints::production()
            },
            timeout,
        }
    }
}

/// HTTP client for the Zarinpal payment gateway.
///
/// Stateless apart from configuration; safe to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ZarinpalClient {
    http: Client,
    cfg: ZarinpalConfig,
}

impl ZarinpalClient {
    /// Builds the client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] if the HTTP client cannot be
    /// constructed (TLS backend initialisation).
    pub fn new(cfg: ZarinpalConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self { http, cfg })
    }

    /// Returns the configured endpoints.
    #[must_use]
    pub fn endpoints(&self) -> &ZarinpalEndpoints {
        &self.cfg.endpoints
    }

    async fn post<B, T>(&self, url: &str, body: &B) -> Result<Envelope<T>, GatewayError>
    where
        B: serde::Serialize + Sync,
        T: serde::de::DeserializeOwned,
    {
        let response = self.http.post(url).json(body).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        serde_json::from_slice::<Envelope<T>>(&bytes)
            .map_err(|e| GatewayError::InvalidResponse(format!("HTTP {status}: {e}")))
    }
}

fn rial(amount: Amount) -> Result<u64, GatewayError> {
    amount
        .to_rial()
        .ok_or_else(|| GatewayError::InvalidRequest(format!("amount {amount} is too large")))
}

fn rejection<T>(errors: Option<ProviderErrors>, data_code: Option<i64>) -> Result<T, GatewayError> {
    let (code, message) = match errors {
        Some(errors) => (errors.code.or(data_code), errors.message),
        None => (data_code, None),
    };
    Err(GatewayError::Rejected {
        code,
        message: message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| UNSPECIFIED_REJECTION.to_string()),
    })
}

fn check_callback_url(callback_url: &str) -> Result<(), GatewayError> {
    let url = Url::parse(callback_url).map_err(|e| {
        GatewayError::InvalidRequest(format!("callback url {callback_url:?} is not absolute: {e}"))
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(GatewayError::InvalidRequest(format!(
            "callback url {callback_url:?} must be an http(s) url with a host"
        )));
    }
    Ok(())
}

#[async_trait]
impl PaymentGateway for ZarinpalClient {
    async fn initiate(&self, request: &PaymentRequest) -> Result<PaymentSession, GatewayError> {
        check_callback_url(&request.callback_url)?;
        let body = PaymentRequestBody {
            merchant_id: &self.cfg.merchant_id,
            amount: rial(request.amount)?,
            description: &request.description,
            callback_url: &request.callback_url,
            metadata: request
                .mobile
                .as_deref()
                .filter(|m| !m.is_empty())
                .map(|mobile| Metadata { mobile }),
        };

        let envelope: Envelope<PaymentRequestData> =
            self.post(&self.cfg.endpoints.request_url, &body).await?;

        let data = envelope.data.into_object();
        match data {
            Some(PaymentRequestData {
                code: CODE_SUCCESS,
                authority: Some(authority),
            }) if !authority.is_empty() => {
                tracing::debug!(%authority, "payment session opened");
                Ok(PaymentSession {
                    redirect_url: self.cfg.endpoints.redirect_url(&authority),
                    authority,
                })
            }
            other => {
                let code = other.map(|d| d.code);
                tracing::warn!(?code, "payment request rejected");
                rejection(envelope.errors.into_object(), code)
            }
        }
    }

    async fn verify(&self, authority: &str, amount: Amount) -> Result<Verification, GatewayError> {
        let body = VerifyRequestBody {
            merchant_id: &self.cfg.merchant_id,
            amount: rial(amount)?,
            authority,
        };

        let envelope: Envelope<VerifyData> =
            self.post(&self.cfg.endpoints.verify_url, &body).await?;

        let data = envelope.data.into_object();
        let receipt = data.as_ref().and_then(VerifyData::ref_id_string);
        match (data.as_ref().map(|d| d.code), receipt) {
            (Some(CODE_SUCCESS), Some(provider_ref_id)) => {
                Ok(Verification::Verified { provider_ref_id })
            }
            (Some(CODE_ALREADY_VERIFIED), Some(provider_ref_id)) => {
                tracing::info!(authority, "payment already verified by provider");
                Ok(Verification::AlreadyVerified { provider_ref_id })
            }
            (code, _) => {
                tracing::warn!(authority, ?code, "payment verification rejected");
                rejection(envelope.errors.into_object(), code)
            }
        }
    }
}
