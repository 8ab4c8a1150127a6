//! Request extractors for caller identity and administrative access.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::domain::Customer;
use crate::error::CheckoutError;

/// Header carrying the administrative shared secret.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// An authenticated caller. Rejects with `401` when the bearer token is
/// missing, unknown, or expired.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Customer);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = CheckoutError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(CheckoutError::Unauthorized)?;
        state
            .identity
            .resolve(token)
            .await?
            .map(Self)
            .ok_or(CheckoutError::Unauthorized)
    }
}

/// The caller if a valid bearer token was sent, anonymous otherwise.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Customer>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = CheckoutError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(&parts.headers) {
            Some(token) => Ok(Self(state.identity.resolve(token).await?)),
            None => Ok(Self(None)),
        }
    }
}

/// Proof that the request carried the administrative token.
///
/// Rejects with `403` when no token is configured or the header does not
/// match it.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = CheckoutError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state.admin_token.as_deref().ok_or(CheckoutError::Forbidden)?;
        let given = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(CheckoutError::Forbidden)?;
        if constant_time_eq(given.as_bytes(), expected.as_bytes()) {
            Ok(Self)
        } else {
            tracing::warn!("rejected administrative request with a wrong token");
            Err(CheckoutError::Forbidden)
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
