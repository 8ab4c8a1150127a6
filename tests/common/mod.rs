//! Shared fixtures for integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use media_checkout::app_state::AppState;
use media_checkout::catalog::InMemoryCatalog;
use media_checkout::domain::{
    AccessType, Amount, ContentType, Customer, EventBus, Listing, SiteSettings, UserId,
};
use media_checkout::gateway::{
    GatewayError, PaymentGateway, PaymentRequest, PaymentSession, Verification,
};
use media_checkout::identity::StaticIdentity;
use media_checkout::ledger::InMemoryLedger;
use media_checkout::service::CheckoutService;

pub const BOOK_ID: i64 = 1;
pub const FREE_PODCAST_ID: i64 = 2;
pub const DISCOUNTED_COURSE_ID: i64 = 3;
pub const BOOK_PRICE: u64 = 50_000;

pub const BUYER_TOKEN: &str = "buyer-session";
pub const OTHER_TOKEN: &str = "other-session";
pub const ADMIN_TOKEN: &str = "admin-secret";

pub fn buyer() -> Customer {
    Customer {
        id: UserId(1),
        phone_number: "09121234567".to_string(),
    }
}

pub fn other_buyer() -> Customer {
    Customer {
        id: UserId(2),
        phone_number: "09350000000".to_string(),
    }
}

/// How [`RecordingGateway::verify`] answers.
#[derive(Debug, Clone)]
pub enum VerifyScript {
    Verified(&'static str),
    AlreadyVerified(&'static str),
    Rejected(&'static str),
}

/// Gateway double that records every call.
#[derive(Debug)]
pub struct RecordingGateway {
    pub initiate_fails: bool,
    pub verify: VerifyScript,
    /// Delay inside `verify`, to widen race windows.
    pub verify_delay: Duration,
    pub initiate_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
    pub requests: Mutex<Vec<PaymentRequest>>,
    pub verified: Mutex<Vec<(String, Amount)>>,
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self {
            initiate_fails: false,
            verify: VerifyScript::Verified("R1"),
            verify_delay: Duration::ZERO,
            initiate_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            verified: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingGateway {
    pub fn initiate_count(&self) -> usize {
        self.initiate_calls.load(Ordering::SeqCst)
    }

    pub fn verify_count(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn initiate(&self, request: &PaymentRequest) -> Result<PaymentSession, GatewayError> {
        self.initiate_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());
        if self.initiate_fails {
            return Err(GatewayError::Transport("connection refused".to_string()));
        }
        Ok(PaymentSession {
            authority: "A1".to_string(),
            redirect_url: "https://sandbox.zarinpal.com/pg/StartPay/A1".to_string(),
        })
    }

    async fn verify(&self, authority: &str, amount: Amount) -> Result<Verification, GatewayError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.verified
            .lock()
            .await
            .push((authority.to_string(), amount));
        if !self.verify_delay.is_zero() {
            tokio::time::sleep(self.verify_delay).await;
        }
        match &self.verify {
            VerifyScript::Verified(r) => Ok(Verification::Verified {
                provider_ref_id: (*r).to_string(),
            }),
            VerifyScript::AlreadyVerified(r) => Ok(Verification::AlreadyVerified {
                provider_ref_id: (*r).to_string(),
            }),
            VerifyScript::Rejected(m) => Err(GatewayError::Rejected {
                code: Some(-51),
                message: (*m).to_string(),
            }),
        }
    }
}

/// Everything a checkout test needs.
#[derive(Debug)]
pub struct Harness {
    pub service: Arc<CheckoutService>,
    pub ledger: Arc<InMemoryLedger>,
    pub catalog: Arc<InMemoryCatalog>,
    pub gateway: Arc<RecordingGateway>,
    pub settings: SiteSettings,
}

fn listing(id: i64, slug: &str, price: u64, discount: u16, access: AccessType) -> Listing {
    Listing {
        id,
        title: slug.replace('-', " "),
        slug: slug.to_string(),
        price: Amount::new(price),
        discount_percent: discount,
        access_type: access,
        is_active: true,
    }
}

pub async fn harness(gateway: RecordingGateway) -> Harness {
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog
        .upsert(
            ContentType::Book,
            listing(BOOK_ID, "little-prince", BOOK_PRICE, 0, AccessType::Paid),
        )
        .await;
    catalog
        .upsert(
            ContentType::Podcast,
            listing(FREE_PODCAST_ID, "morning-talk", 0, 0, AccessType::Free),
        )
        .await;
    catalog
        .upsert(
            ContentType::Course,
            listing(DISCOUNTED_COURSE_ID, "rust-basics", 99_999, 25, AccessType::Premium),
        )
        .await;

    let ledger = Arc::new(InMemoryLedger::new());
    let gateway = Arc::new(gateway);
    let service = Arc::new(CheckoutService::new(
        Arc::clone(&ledger) as _,
        Arc::clone(&catalog) as _,
        Arc::clone(&gateway) as _,
        EventBus::new(256),
        "https://shop.example",
    ));
    Harness {
        service,
        ledger,
        catalog,
        gateway,
        settings: SiteSettings::default(),
    }
}

/// Application state over a harness, with two signed-in buyers.
pub async fn app_state(h: &Harness, settings: SiteSettings) -> AppState {
    let identity = StaticIdentity::new();
    identity.insert(BUYER_TOKEN, buyer()).await;
    identity.insert(OTHER_TOKEN, other_buyer()).await;
    AppState {
        checkout: Arc::clone(&h.service),
        identity: Arc::new(identity),
        settings: Arc::new(settings),
        admin_token: Some(Arc::from(ADMIN_TOKEN)),
    }
}

/// What the mock provider answers and what it received.
#[derive(Debug, Default)]
pub struct MockProvider {
    pub request_reply: Mutex<Value>,
    pub verify_reply: Mutex<Value>,
    pub delay: Mutex<Duration>,
    pub request_bodies: Mutex<Vec<Value>>,
    pub verify_bodies: Mutex<Vec<Value>>,
}

impl MockProvider {
    pub fn accepting(authority: &str, ref_id: i64) -> Self {
        Self {
            request_reply: Mutex::new(json!({
                "data": { "code": 100, "message": "Success", "authority": authority, "fee_type": "Merchant", "fee": 0 },
                "errors": []
            })),
            verify_reply: Mutex::new(json!({
                "data": { "code": 100, "message": "Verified", "ref_id": ref_id, "card_pan": "502229******5995" },
                "errors": []
            })),
            ..Self::default()
        }
    }
}

async fn mock_request(State(p): State<Arc<MockProvider>>, Json(body): Json<Value>) -> Json<Value> {
    p.request_bodies.lock().await.push(body);
    let delay = *p.delay.lock().await;
    tokio::time::sleep(delay).await;
    Json(p.request_reply.lock().await.clone())
}

async fn mock_verify(State(p): State<Arc<MockProvider>>, Json(body): Json<Value>) -> Json<Value> {
    p.verify_bodies.lock().await.push(body);
    let delay = *p.delay.lock().await;
    tokio::time::sleep(delay).await;
    Json(p.verify_reply.lock().await.clone())
}

/// Serves `provider` on an ephemeral local port and returns its base URL.
pub async fn spawn_provider(provider: Arc<MockProvider>) -> String {
    let app = Router::new()
        .route("/pg/v4/payment/request.json", post(mock_request))
        .route("/pg/v4/payment/verify.json", post(mock_verify))
        .with_state(provider);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
