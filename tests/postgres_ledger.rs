//! Ledger properties against a real PostgreSQL database.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

#![allow(clippy::panic)]

use std::sync::Arc;

use imagegen_gateway::config::DatabaseConfig;
use imagegen_gateway::domain::{EventBus, NewGeneration, UserId, UserProfile};
use imagegen_gateway::error::GatewayError;
use imagegen_gateway::persistence::{LedgerStore, PostgresLedgerStore};
use imagegen_gateway::service::LedgerService;
use uuid::Uuid;

async fn connect() -> LedgerService {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        panic!("DATABASE_URL must be set for postgres tests");
    };
    let config = DatabaseConfig {
        url,
        max_connections: 10,
        min_connections: 1,
        acquire_timeout_secs: 5,
    };
    let Ok(store) = PostgresLedgerStore::connect(&config).await else {
        panic!("failed to connect");
    };
    let Ok(()) = store.migrate().await else {
        panic!("migrations failed");
    };
    LedgerService::new(Arc::new(store) as Arc<dyn LedgerStore>, EventBus::new(16))
}

fn fresh_user() -> UserId {
    UserId::new((Uuid::new_v4().as_u128() % 1_000_000_000_000) as i64)
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn bonus_is_granted_once_and_never_again() {
    let ledger = connect().await;
    let user = fresh_user();

    let Ok(outcome) = ledger.start_session(user, &UserProfile::default(), 3).await else {
        panic!("start_session failed");
    };
    assert!(outcome.bonus_granted);
    assert!(matches!(ledger.deduct_credits(user, 3).await, Ok(true)));

    let Ok(again) = ledger.start_session(user, &UserProfile::default(), 3).await else {
        panic!("start_session failed");
    };
    assert!(!again.bonus_granted);
    assert!(matches!(ledger.get_balance(user).await, Ok(0)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Requires PostgreSQL
async fn concurrent_deductions_never_overdraw() {
    let ledger = Arc::new(connect().await);
    let user = fresh_user();
    let _ = ledger.ensure_account(user, &UserProfile::default()).await;
    let _ = ledger.add_credits(user, 5).await;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move { ledger.deduct_credits(user, 1).await })
        })
        .collect();
    let mut succeeded = 0;
    for handle in handles {
        if let Ok(Ok(true)) = handle.await {
            succeeded += 1;
        }
    }
    assert_eq!(succeeded, 5);
    assert!(matches!(ledger.get_balance(user).await, Ok(0)));
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn refund_is_idempotent() {
    let ledger = connect().await;
    let user = fresh_user();
    let _ = ledger.ensure_account(user, &UserProfile::default()).await;
    let request_id = Uuid::new_v4();

    assert!(matches!(ledger.refund_credits(user, 1, request_id).await, Ok(true)));
    assert!(matches!(ledger.refund_credits(user, 1, request_id).await, Ok(false)));
    assert!(matches!(ledger.get_balance(user).await, Ok(1)));
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn generation_and_purchase_records() {
    let ledger = connect().await;
    let user = fresh_user();
    let _ = ledger.ensure_account(user, &UserProfile::default()).await;

    let Ok(Some(generation)) = ledger
        .record_generation(NewGeneration {
            user_id: user,
            request_id: Some(Uuid::new_v4()),
            prompt: "a quiet harbour".to_string(),
            negative_prompt: None,
            image_url: "https://img/harbour.webp".to_string(),
            asset_id: None,
            cost: 1,
        })
        .await
    else {
        panic!("generation not recorded");
    };
    assert_eq!(generation.user_id, user);

    let Ok(Some(stats)) = ledger.get_stats(user).await else {
        panic!("stats missing");
    };
    assert_eq!(stats.generation_count, 1);

    let payment_id = format!("{user}_{}", Uuid::new_v4());
    let first = ledger
        .create_purchase_intent(user, "10", Some(payment_id.clone()))
        .await;
    assert!(first.is_ok());
    let second = ledger
        .create_purchase_intent(user, "10", Some(payment_id))
        .await;
    assert!(matches!(second, Err(GatewayError::DuplicatePayment(_))));
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn overflowing_top_up_is_invalid_amount() {
    let ledger = connect().await;
    let user = fresh_user();
    let _ = ledger.ensure_account(user, &UserProfile::default()).await;
    let _ = ledger.add_credits(user, 5).await;

    let result = ledger.add_credits(user, i64::MAX).await;
    assert!(matches!(result, Err(GatewayError::InvalidAmount(i64::MAX))));
    assert!(matches!(ledger.get_balance(user).await, Ok(5)));
}
