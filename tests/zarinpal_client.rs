//! Zarinpal client against a local mock provider.

#![allow(clippy::unwrap_used, clippy::panic, clippy::indexing_slicing)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use media_checkout::domain::Amount;
use media_checkout::gateway::{
    GatewayError, PaymentGateway, PaymentRequest, Verification, ZarinpalClient, ZarinpalConfig,
    ZarinpalEndpoints,
};

use common::{MockProvider, spawn_provider};

const MERCHANT: &str = "00000000-0000-0000-0000-000000000000";

async fn client_for(provider: &Arc<MockProvider>, timeout: Duration) -> (ZarinpalClient, String) {
    let base = spawn_provider(Arc::clone(provider)).await;
    let client = ZarinpalClient::new(ZarinpalConfig {
        merchant_id: MERCHANT.to_string(),
        endpoints: ZarinpalEndpoints::with_hosts(&base, &base),
        timeout,
    })
    .unwrap();
    (client, base)
}

fn request(callback_url: &str) -> PaymentRequest {
    PaymentRequest {
        amount: Amount::new(50_000),
        description: "Mahboob - Book purchase: The Little Prince".to_string(),
        callback_url: callback_url.to_string(),
        mobile: Some("09121234567".to_string()),
    }
}

#[tokio::test]
async fn initiate_sends_rial_and_builds_redirect() {
    let provider = Arc::new(MockProvider::accepting("A1", 201));
    let (client, base) = client_for(&provider, Duration::from_secs(5)).await;

    let session = client
        .initiate(&request("https://shop.example/purchase/callback/0123456789ABCDEF"))
        .await
        .unwrap();
    assert_eq!(session.authority, "A1");
    assert_eq!(session.redirect_url, format!("{base}/pg/StartPay/A1"));

    let bodies = provider.request_bodies.lock().await;
    assert_eq!(bodies.len(), 1);
    let body = &bodies[0];
    assert_eq!(body["merchant_id"], MERCHANT);
    assert_eq!(body["amount"], 500_000);
    assert_eq!(
        body["callback_url"],
        "https://shop.example/purchase/callback/0123456789ABCDEF"
    );
    assert_eq!(body["metadata"]["mobile"], "09121234567");
}

#[tokio::test]
async fn initiate_omits_missing_mobile() {
    let provider = Arc::new(MockProvider::accepting("A1", 201));
    let (client, _) = client_for(&provider, Duration::from_secs(5)).await;

    let mut req = request("https://shop.example/purchase/callback/0123456789ABCDEF");
    req.mobile = None;
    client.initiate(&req).await.unwrap();

    let bodies = provider.request_bodies.lock().await;
    assert!(bodies[0].get("metadata").is_none());
}

#[tokio::test]
async fn initiate_rejection_carries_provider_message() {
    let provider = Arc::new(MockProvider::accepting("A1", 201));
    *provider.request_reply.lock().await = json!({
        "data": [],
        "errors": { "code": -9, "message": "The input params invalid, validation error." }
    });
    let (client, _) = client_for(&provider, Duration::from_secs(5)).await;

    let err = client
        .initiate(&request("https://shop.example/purchase/callback/0123456789ABCDEF"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GatewayError::Rejected {
            code: Some(-9),
            message: "The input params invalid, validation error.".to_string(),
        }
    );
}

#[tokio::test]
async fn initiate_refuses_relative_callback_without_calling_out() {
    let provider = Arc::new(MockProvider::accepting("A1", 201));
    let (client, _) = client_for(&provider, Duration::from_secs(5)).await;

    let err = client
        .initiate(&request("/purchase/callback/0123456789ABCDEF"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::InvalidRequest(_)));
    assert!(provider.request_bodies.lock().await.is_empty());
}

#[tokio::test]
async fn verify_success_and_already_verified() {
    let provider = Arc::new(MockProvider::accepting("A1", 201));
    let (client, _) = client_for(&provider, Duration::from_secs(5)).await;

    let first = client.verify("A1", Amount::new(50_000)).await.unwrap();
    assert_eq!(
        first,
        Verification::Verified {
            provider_ref_id: "201".to_string()
        }
    );

    *provider.verify_reply.lock().await = json!({
        "data": { "code": 101, "message": "Verified", "ref_id": 201 },
        "errors": []
    });
    let second = client.verify("A1", Amount::new(50_000)).await.unwrap();
    assert_eq!(
        second,
        Verification::AlreadyVerified {
            provider_ref_id: "201".to_string()
        }
    );

    let bodies = provider.verify_bodies.lock().await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["authority"], "A1");
    assert_eq!(bodies[0]["amount"], 500_000);
    assert_eq!(bodies[0]["merchant_id"], MERCHANT);
}

#[tokio::test]
async fn verify_other_code_is_rejected() {
    let provider = Arc::new(MockProvider::accepting("A1", 201));
    *provider.verify_reply.lock().await = json!({
        "data": [],
        "errors": { "code": -51, "message": "Session is not valid, session is not active paid try." }
    });
    let (client, _) = client_for(&provider, Duration::from_secs(5)).await;

    let err = client.verify("A1", Amount::new(50_000)).await.unwrap_err();
    let GatewayError::Rejected { code, message } = err else {
        panic!("expected a rejection, got {err:?}");
    };
    assert_eq!(code, Some(-51));
    assert!(message.starts_with("Session is not valid"));
}

#[tokio::test]
async fn slow_provider_is_a_transport_error() {
    let provider = Arc::new(MockProvider::accepting("A1", 201));
    *provider.delay.lock().await = Duration::from_millis(500);
    let (client, _) = client_for(&provider, Duration::from_millis(100)).await;

    let err = client.verify("A1", Amount::new(50_000)).await.unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)), "{err:?}");
    assert_eq!(err.user_message(), "could not reach the payment provider");
}

#[tokio::test]
async fn non_json_answer_is_invalid_response() {
    let provider = Arc::new(MockProvider::accepting("A1", 201));
    *provider.verify_reply.lock().await = json!("maintenance");
    let (client, _) = client_for(&provider, Duration::from_secs(5)).await;

    let err = client.verify("A1", Amount::new(50_000)).await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidResponse(_)), "{err:?}");
}
