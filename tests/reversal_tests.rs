mod common;

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use banking_core::error::AppError;
use banking_core::fees::FeeAssessment;
use banking_core::models::{ReversalStatus, ReversalType, TransactionStatus};
use banking_core::services::{LedgerService, LogNotifier, ReversalService};

fn no_fee() -> FeeAssessment {
    FeeAssessment {
        amount: Decimal::ZERO,
        rule_id: None,
    }
}

async fn transfer_fixture(
    pool: &sqlx::PgPool,
) -> (
    LedgerService,
    ReversalService,
    banking_core::models::Account,
    banking_core::models::Account,
    banking_core::models::Transaction,
) {
    let profit_id = common::profit_account_id(pool).await;
    let ledger = LedgerService::new(pool.clone(), profit_id);
    let reversals = ReversalService::new(pool.clone(), Arc::new(LogNotifier));

    let sender = common::create_account(pool, dec!(500)).await;
    let receiver = common::create_account(pool, dec!(200)).await;

    let posting = ledger
        .transfer(sender.id, receiver.id, dec!(50), no_fee(), None)
        .await
        .expect("transfer failed");

    (ledger, reversals, sender, receiver, posting.out_entry)
}

async fn balances(pool: &sqlx::PgPool, id: Uuid) -> (Decimal, Decimal) {
    sqlx::query_as::<_, (Decimal, Decimal)>(
        "SELECT balance, available_balance FROM accounts WHERE id = $1",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn test_refund_reversal_full_lifecycle() {
    let Some(pool) = common::try_pool().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };
    common::cleanup(&pool).await;

    let (ledger, reversals, sender, receiver, original) = transfer_fixture(&pool).await;
    // After the transfer: sender 450, receiver 250.

    let request = reversals
        .create(
            original.id,
            sender.customer_id,
            None,
            "duplicate transfer".to_string(),
            ReversalType::Refund,
        )
        .await
        .expect("create failed");
    assert_eq!(request.status, ReversalStatus::Pending);

    // Approve holds 50 on the receiver: available drops, balance does not.
    let request = reversals
        .approve(request.id, Uuid::new_v4())
        .await
        .expect("approve failed");
    assert_eq!(request.status, ReversalStatus::Approved);
    assert_eq!(request.hold_account_id, Some(receiver.id));

    let (balance, available) = balances(&pool, receiver.id).await;
    assert_eq!(balance, dec!(250));
    assert_eq!(available, dec!(200));

    // Complete moves the held funds back to the sender.
    let request = reversals.complete(request.id).await.expect("complete failed");
    assert_eq!(request.status, ReversalStatus::Completed);
    assert!(request.completed_at.is_some());

    let (balance, available) = balances(&pool, receiver.id).await;
    assert_eq!(balance, dec!(200));
    assert_eq!(available, dec!(200));

    let (balance, available) = balances(&pool, sender.id).await;
    assert_eq!(balance, dec!(500));
    assert_eq!(available, dec!(500));

    // Original entry is now REVERSED.
    let status: TransactionStatus =
        sqlx::query_scalar("SELECT status FROM transactions WHERE id = $1")
            .bind(original.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, TransactionStatus::Reversed);

    assert!(ledger.verify_replay(sender.id).await.unwrap());
    assert!(ledger.verify_replay(receiver.id).await.unwrap());

    common::cleanup(&pool).await;
}

#[tokio::test]
async fn test_send_to_receiver_holds_sender_and_forwards() {
    let Some(pool) = common::try_pool().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };
    common::cleanup(&pool).await;

    let (ledger, reversals, sender, receiver, original) = transfer_fixture(&pool).await;

    let request = reversals
        .create(
            original.id,
            sender.customer_id,
            Some(dec!(30)),
            "guarantee delivery".to_string(),
            ReversalType::SendToReceiver,
        )
        .await
        .unwrap();

    let request = reversals.approve(request.id, Uuid::new_v4()).await.unwrap();
    assert_eq!(request.hold_account_id, Some(sender.id));

    let (balance, available) = balances(&pool, sender.id).await;
    assert_eq!(balance, dec!(450));
    assert_eq!(available, dec!(420));

    reversals.complete(request.id).await.unwrap();

    // Sender's balance catches down to the already-reduced available.
    let (balance, available) = balances(&pool, sender.id).await;
    assert_eq!(balance, dec!(420));
    assert_eq!(available, dec!(420));

    let (balance, available) = balances(&pool, receiver.id).await;
    assert_eq!(balance, dec!(280));
    assert_eq!(available, dec!(280));

    assert!(ledger.verify_replay(sender.id).await.unwrap());
    assert!(ledger.verify_replay(receiver.id).await.unwrap());

    common::cleanup(&pool).await;
}

#[tokio::test]
async fn test_complete_from_pending_is_invalid_transition() {
    let Some(pool) = common::try_pool().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };
    common::cleanup(&pool).await;

    let (_ledger, reversals, sender, _receiver, original) = transfer_fixture(&pool).await;

    let request = reversals
        .create(
            original.id,
            sender.customer_id,
            None,
            "dispute".to_string(),
            ReversalType::Refund,
        )
        .await
        .unwrap();

    let err = reversals.complete(request.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidStateTransition { .. }));

    // Request still PENDING, no balances touched.
    let status: ReversalStatus =
        sqlx::query_scalar("SELECT status FROM reversal_requests WHERE id = $1")
            .bind(request.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, ReversalStatus::Pending);

    common::cleanup(&pool).await;
}

#[tokio::test]
async fn test_approve_fails_when_receiver_spent_the_money() {
    let Some(pool) = common::try_pool().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };
    common::cleanup(&pool).await;

    let (ledger, reversals, sender, receiver, original) = transfer_fixture(&pool).await;

    // Receiver drains their account below the disputed amount.
    ledger
        .debit(
            receiver.id,
            dec!(230),
            no_fee(),
            banking_core::models::TransactionType::Withdrawal,
            None,
        )
        .await
        .unwrap();

    let request = reversals
        .create(
            original.id,
            sender.customer_id,
            None,
            "dispute".to_string(),
            ReversalType::Refund,
        )
        .await
        .unwrap();

    let err = reversals.approve(request.id, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientAvailableBalance { .. }));

    // No partial hold: request stays PENDING, receiver untouched.
    let status: ReversalStatus =
        sqlx::query_scalar("SELECT status FROM reversal_requests WHERE id = $1")
            .bind(request.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, ReversalStatus::Pending);

    let (balance, available) = balances(&pool, receiver.id).await;
    assert_eq!(balance, dec!(20));
    assert_eq!(available, dec!(20));

    common::cleanup(&pool).await;
}

#[tokio::test]
async fn test_release_hold_returns_available_balance() {
    let Some(pool) = common::try_pool().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };
    common::cleanup(&pool).await;

    let (_ledger, reversals, sender, receiver, original) = transfer_fixture(&pool).await;

    let request = reversals
        .create(
            original.id,
            sender.customer_id,
            None,
            "dispute".to_string(),
            ReversalType::Refund,
        )
        .await
        .unwrap();
    let request = reversals.approve(request.id, Uuid::new_v4()).await.unwrap();

    let (_, available) = balances(&pool, receiver.id).await;
    assert_eq!(available, dec!(200));

    let request = reversals
        .release_hold(request.id, Uuid::new_v4(), "customer withdrew dispute".to_string())
        .await
        .unwrap();
    assert_eq!(request.status, ReversalStatus::Rejected);

    let (balance, available) = balances(&pool, receiver.id).await;
    assert_eq!(balance, dec!(250));
    assert_eq!(available, dec!(250));

    // Original transaction was never reversed.
    let status: TransactionStatus =
        sqlx::query_scalar("SELECT status FROM transactions WHERE id = $1")
            .bind(original.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, TransactionStatus::Completed);

    common::cleanup(&pool).await;
}
