//! End-to-end checkout flows over the in-memory backends.

#![allow(clippy::unwrap_used, clippy::panic, clippy::indexing_slicing)]

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use media_checkout::domain::{Amount, ContentType, PurchaseStatus, RefId};
use media_checkout::error::CheckoutError;
use media_checkout::ledger::{Page, PurchaseFilter, PurchaseLedger};
use media_checkout::service::{CallbackParams, StartOutcome};

use common::*;

fn paid(authority: &str) -> CallbackParams {
    CallbackParams {
        status: Some("OK".to_string()),
        authority: Some(authority.to_string()),
    }
}

async fn start_book(h: &Harness) -> RefId {
    let outcome = h
        .service
        .start(&buyer(), ContentType::Book, BOOK_ID, &h.settings)
        .await;
    let Ok(StartOutcome::Redirect { ref_id, redirect_url }) = outcome else {
        panic!("expected a redirect, got {outcome:?}");
    };
    assert_eq!(redirect_url, "https://sandbox.zarinpal.com/pg/StartPay/A1");
    ref_id
}

async fn all_purchases(h: &Harness) -> Vec<media_checkout::domain::Purchase> {
    h.ledger
        .list(&PurchaseFilter::default(), Page { page: 1, per_page: 1_000 })
        .await
        .unwrap()
        .items
}

#[tokio::test]
async fn paid_book_start_creates_pending_purchase() {
    let h = harness(RecordingGateway::default()).await;
    let ref_id = start_book(&h).await;

    let purchase = h.ledger.get(&ref_id).await.unwrap().unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Pending);
    assert_eq!(purchase.amount, Amount::new(BOOK_PRICE));
    assert_eq!(purchase.authority.as_deref(), Some("A1"));
    assert_eq!(purchase.paid_at, None);
    assert_eq!(purchase.provider_ref_id, None);

    let requests = h.gateway.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount, Amount::new(BOOK_PRICE));
    assert_eq!(
        requests[0].callback_url,
        format!("https://shop.example/purchase/callback/{ref_id}")
    );
    assert_eq!(requests[0].mobile.as_deref(), Some("09121234567"));
    assert!(requests[0].description.contains("little prince"));
}

#[tokio::test]
async fn successful_callback_grants_access() {
    let h = harness(RecordingGateway::default()).await;
    let ref_id = start_book(&h).await;
    assert!(
        !h.ledger
            .has_access(Some(buyer().id), ContentType::Book, BOOK_ID)
            .await
            .unwrap()
    );

    let outcome = h.service.callback(&ref_id, &paid("A1")).await.unwrap();
    assert!(outcome.is_success());
    assert!(!outcome.replayed);
    assert_eq!(outcome.purchase.provider_ref_id.as_deref(), Some("R1"));
    assert!(outcome.purchase.paid_at.is_some());
    assert_eq!(outcome.content_url.as_deref(), Some("/books/little-prince/"));

    assert_eq!(
        *h.gateway.verified.lock().await,
        vec![("A1".to_string(), Amount::new(BOOK_PRICE))]
    );
    assert!(
        h.ledger
            .has_access(Some(buyer().id), ContentType::Book, BOOK_ID)
            .await
            .unwrap()
    );
    assert!(
        !h.ledger
            .has_access(Some(other_buyer().id), ContentType::Book, BOOK_ID)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn repeated_callback_is_idempotent() {
    let h = harness(RecordingGateway::default()).await;
    let ref_id = start_book(&h).await;

    let first = h.service.callback(&ref_id, &paid("A1")).await.unwrap();
    let second = h.service.callback(&ref_id, &paid("A1")).await.unwrap();

    assert_eq!(h.gateway.verify_count(), 1);
    assert!(second.replayed);
    assert_eq!(second.purchase, first.purchase);
    assert_eq!(second.purchase.status, PurchaseStatus::Success);
}

#[tokio::test]
async fn cancelled_callback_fails_without_verify() {
    let h = harness(RecordingGateway::default()).await;
    let ref_id = start_book(&h).await;

    let params = CallbackParams {
        status: Some("NOK".to_string()),
        authority: Some("A1".to_string()),
    };
    let outcome = h.service.callback(&ref_id, &params).await.unwrap();

    assert_eq!(outcome.purchase.status, PurchaseStatus::Failed);
    assert!(outcome.message.contains(ref_id.as_str()));
    assert_eq!(h.gateway.verify_count(), 0);
    assert!(
        !h.ledger
            .has_access(Some(buyer().id), ContentType::Book, BOOK_ID)
            .await
            .unwrap()
    );

    // A later "OK" for the same purchase changes nothing.
    let replay = h.service.callback(&ref_id, &paid("A1")).await.unwrap();
    assert!(replay.replayed);
    assert_eq!(replay.purchase.status, PurchaseStatus::Failed);
    assert_eq!(h.gateway.verify_count(), 0);
}

#[tokio::test]
async fn free_item_short_circuits() {
    let h = harness(RecordingGateway::default()).await;
    let outcome = h
        .service
        .start(&buyer(), ContentType::Podcast, FREE_PODCAST_ID, &h.settings)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        StartOutcome::Free {
            destination: "/podcasts/morning-talk/".to_string()
        }
    );
    assert!(h.ledger.is_empty().await);
    assert_eq!(h.gateway.initiate_count(), 0);
}

#[tokio::test]
async fn owned_item_short_circuits() {
    let h = harness(RecordingGateway::default()).await;
    let ref_id = start_book(&h).await;
    h.service.callback(&ref_id, &paid("A1")).await.unwrap();
    let before = h.ledger.len().await;

    let outcome = h
        .service
        .start(&buyer(), ContentType::Book, BOOK_ID, &h.settings)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        StartOutcome::AlreadyOwned {
            destination: "/books/little-prince/".to_string()
        }
    );
    assert_eq!(h.ledger.len().await, before);
    assert_eq!(h.gateway.initiate_count(), 1);
}

#[tokio::test]
async fn discounted_price_is_charged() {
    let h = harness(RecordingGateway::default()).await;
    let outcome = h
        .service
        .start(&buyer(), ContentType::Course, DISCOUNTED_COURSE_ID, &h.settings)
        .await
        .unwrap();
    let StartOutcome::Redirect { ref_id, .. } = outcome else {
        panic!("expected a redirect");
    };
    let purchase = h.ledger.get(&ref_id).await.unwrap().unwrap();
    // 99_999 * 75 / 100, rounded down
    assert_eq!(purchase.amount, Amount::new(74_999));
}

#[tokio::test]
async fn repeated_starts_create_independent_purchases() {
    let h = harness(RecordingGateway::default()).await;
    let mut seen = HashSet::new();
    for _ in 0..25 {
        assert!(seen.insert(start_book(&h).await));
    }
    assert_eq!(h.ledger.len().await, 25);
    let refs: HashSet<RefId> = all_purchases(&h).await.into_iter().map(|p| p.ref_id).collect();
    assert_eq!(refs.len(), 25);
}

#[tokio::test]
async fn unreachable_gateway_fails_the_purchase() {
    let h = harness(RecordingGateway {
        initiate_fails: true,
        ..RecordingGateway::default()
    })
    .await;
    let result = h
        .service
        .start(&buyer(), ContentType::Book, BOOK_ID, &h.settings)
        .await;

    let Err(CheckoutError::PaymentGateway {
        message,
        ref_id: Some(ref_id),
        destination,
    }) = result
    else {
        panic!("expected a gateway error, got {result:?}");
    };
    assert_eq!(message, "could not reach the payment provider");
    assert_eq!(destination.as_deref(), Some("/books/little-prince/"));
    let purchase = h.ledger.get(&ref_id).await.unwrap().unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Failed);
    assert!(
        all_purchases(&h)
            .await
            .iter()
            .all(|p| p.status != PurchaseStatus::Pending)
    );
}

#[tokio::test]
async fn already_verified_counts_as_success() {
    let h = harness(RecordingGateway {
        verify: VerifyScript::AlreadyVerified("R7"),
        ..RecordingGateway::default()
    })
    .await;
    let ref_id = start_book(&h).await;
    let outcome = h.service.callback(&ref_id, &paid("A1")).await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.purchase.provider_ref_id.as_deref(), Some("R7"));
}

#[tokio::test]
async fn concurrent_callbacks_verify_once() {
    let h = harness(RecordingGateway {
        verify_delay: Duration::from_millis(50),
        ..RecordingGateway::default()
    })
    .await;
    let ref_id = start_book(&h).await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&h.service);
        let ref_id = ref_id.clone();
        tasks.push(tokio::spawn(async move {
            service.callback(&ref_id, &paid("A1")).await
        }));
    }
    let mut fresh = 0;
    for task in tasks {
        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome.purchase.status, PurchaseStatus::Success);
        assert_eq!(outcome.purchase.provider_ref_id.as_deref(), Some("R1"));
        if !outcome.replayed {
            fresh += 1;
        }
    }

    assert_eq!(fresh, 1);
    assert_eq!(h.gateway.verify_count(), 1);
}

#[tokio::test]
async fn terminal_status_never_changes_and_paid_at_tracks_success() {
    let h = harness(RecordingGateway {
        verify: VerifyScript::Rejected("insufficient funds"),
        ..RecordingGateway::default()
    })
    .await;
    let failed = start_book(&h).await;
    let pending = start_book(&h).await;

    let outcome = h.service.callback(&failed, &paid("A1")).await.unwrap();
    assert_eq!(outcome.purchase.status, PurchaseStatus::Failed);
    assert!(outcome.message.contains("insufficient funds"));

    for _ in 0..3 {
        let again = h.service.callback(&failed, &paid("A1")).await.unwrap();
        assert_eq!(again.purchase.status, PurchaseStatus::Failed);
    }
    assert_eq!(h.gateway.verify_count(), 1);

    for p in all_purchases(&h).await {
        assert_eq!(p.paid_at.is_some(), p.status == PurchaseStatus::Success);
    }
    let still_pending = h.ledger.get(&pending).await.unwrap().unwrap();
    assert_eq!(still_pending.status, PurchaseStatus::Pending);
}

#[tokio::test]
async fn anonymous_never_has_access() {
    let h = harness(RecordingGateway::default()).await;
    let ref_id = start_book(&h).await;
    h.service.callback(&ref_id, &paid("A1")).await.unwrap();

    assert!(
        !h.ledger
            .has_access(None, ContentType::Book, BOOK_ID)
            .await
            .unwrap()
    );
    assert!(
        !h.service
            .content_access(None, ContentType::Book, BOOK_ID)
            .await
            .unwrap()
    );
    // Free content is open regardless of the ledger.
    assert!(
        h.service
            .content_access(None, ContentType::Podcast, FREE_PODCAST_ID)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn callback_with_malformed_params_fails_resolvable_purchase() {
    let h = harness(RecordingGateway::default()).await;
    let ref_id = start_book(&h).await;
    let outcome = h
        .service
        .callback(
            &ref_id,
            &CallbackParams {
                status: Some("OK".to_string()),
                authority: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.purchase.status, PurchaseStatus::Failed);
    assert_eq!(h.gateway.verify_count(), 0);
}

#[tokio::test]
async fn events_follow_the_purchase() {
    let h = harness(RecordingGateway::default()).await;
    let mut events = h.service.event_bus().subscribe();
    let ref_id = start_book(&h).await;
    h.service.callback(&ref_id, &paid("A1")).await.unwrap();

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        assert_eq!(event.ref_id(), &ref_id);
        kinds.push(event.event_type_str());
    }
    assert_eq!(
        kinds,
        vec!["purchase_created", "authority_attached", "purchase_succeeded"]
    );
}

#[tokio::test]
async fn expired_purchase_cannot_be_paid_late() {
    let h = harness(RecordingGateway::default()).await;
    let ref_id = start_book(&h).await;

    let cutoff = chrono::Utc::now() + chrono::Duration::seconds(1);
    let expired = h.service.expire_stale(cutoff).await.unwrap();
    assert_eq!(expired, vec![ref_id.clone()]);

    let outcome = h.service.callback(&ref_id, &paid("A1")).await.unwrap();
    assert!(outcome.replayed);
    assert_eq!(outcome.purchase.status, PurchaseStatus::Failed);
    assert_eq!(h.gateway.verify_count(), 0);
}

#[tokio::test]
async fn customer_history_is_scoped() {
    let h = harness(RecordingGateway::default()).await;
    start_book(&h).await;
    start_book(&h).await;

    let mine = h
        .service
        .customer_purchases(&buyer(), Page { page: 1, per_page: 10 })
        .await;
    tokio_test::assert_ok!(&mine);
    assert_eq!(mine.unwrap().total, 2);

    let theirs = h
        .service
        .customer_purchases(&other_buyer(), Page { page: 1, per_page: 10 })
        .await
        .unwrap();
    assert_eq!(theirs.total, 0);
}

#[tokio::test]
async fn slow_verification_does_not_stall_other_buyers() {
    let h = harness(RecordingGateway {
        verify_delay: Duration::from_millis(800),
        ..RecordingGateway::default()
    })
    .await;
    let ref_id = start_book(&h).await;

    let settling = {
        let service = Arc::clone(&h.service);
        let ref_id = ref_id.clone();
        tokio::spawn(async move { service.callback(&ref_id, &paid("A1")).await })
    };
    while h.gateway.verify_count() == 0 {
        tokio::task::yield_now().await;
    }

    let quick = Duration::from_millis(200);
    let access = tokio::time::timeout(
        quick,
        h.ledger
            .has_access(Some(other_buyer().id), ContentType::Course, DISCOUNTED_COURSE_ID),
    )
    .await;
    assert!(matches!(access, Ok(Ok(false))));

    let start = tokio::time::timeout(
        quick,
        h.service.start(
            &other_buyer(),
            ContentType::Podcast,
            FREE_PODCAST_ID,
            &h.settings,
        ),
    )
    .await;
    assert!(matches!(start, Ok(Ok(StartOutcome::Free { .. }))));

    let pending = tokio::time::timeout(quick, h.ledger.get(&ref_id))
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(pending.status, PurchaseStatus::Pending);

    let outcome = settling.await.unwrap().unwrap();
    assert!(outcome.is_success());
}
