mod common;

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use banking_core::gateway::{GatewayOutcome, MobileMoneyAdapter};
use banking_core::models::SettlementStatus;
use banking_core::reconciliation::{ReconcileAction, ReconciliationProcessor};
use banking_core::services::LogNotifier;

fn processor(pool: &sqlx::PgPool, gateway: Arc<common::StubGateway>) -> ReconciliationProcessor {
    ReconciliationProcessor::new(
        pool.clone(),
        gateway,
        Arc::new(LogNotifier),
        Duration::from_secs(5),
        Duration::from_millis(1),
    )
}

fn success_callback(checkout_id: &str, receipt: &str) -> banking_core::gateway::CallbackPayload {
    serde_json::from_value(serde_json::json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "MR-1",
                "CheckoutRequestID": checkout_id,
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {
                    "Item": [
                        {"Name": "MpesaReceiptNumber", "Value": receipt}
                    ]
                }
            }
        }
    }))
    .unwrap()
}

async fn settlement_status(pool: &sqlx::PgPool, checkout_id: &str) -> SettlementStatus {
    sqlx::query_scalar("SELECT status FROM mobile_money_requests WHERE checkout_request_id = $1")
        .bind(checkout_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn account_balance(pool: &sqlx::PgPool, id: uuid::Uuid) -> Decimal {
    sqlx::query_scalar("SELECT balance FROM accounts WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_deposit_callback_credits_account_exactly_once() {
    let Some(pool) = common::try_pool().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };
    common::cleanup(&pool).await;

    let gateway = common::StubGateway::new();
    let adapter = MobileMoneyAdapter::new(pool.clone(), gateway.clone());
    let processor = processor(&pool, gateway);

    let account = common::create_account(&pool, dec!(100)).await;

    let request = adapter
        .initiate_deposit(account.id, "0712345678", dec!(250))
        .await
        .expect("initiation failed");
    assert_eq!(request.status, SettlementStatus::Pending);
    assert_eq!(request.phone_number, "254712345678");

    let callback = success_callback(&request.checkout_request_id, "NLJ7RT61SV");

    // First delivery applies the credit.
    let action = processor.handle_callback(&callback).await.unwrap();
    assert_eq!(action, ReconcileAction::Applied);
    assert_eq!(account_balance(&pool, account.id).await, dec!(350));
    assert_eq!(
        settlement_status(&pool, &request.checkout_request_id).await,
        SettlementStatus::Completed
    );

    // Replayed delivery is a no-op.
    let action = processor.handle_callback(&callback).await.unwrap();
    assert_eq!(action, ReconcileAction::AlreadyResolved);
    assert_eq!(account_balance(&pool, account.id).await, dec!(350));

    common::cleanup(&pool).await;
}

#[tokio::test]
async fn test_cancelled_callback_has_no_ledger_effect() {
    let Some(pool) = common::try_pool().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };
    common::cleanup(&pool).await;

    let gateway = common::StubGateway::new();
    let adapter = MobileMoneyAdapter::new(pool.clone(), gateway.clone());
    let processor = processor(&pool, gateway);

    let account = common::create_account(&pool, dec!(100)).await;
    let request = adapter
        .initiate_deposit(account.id, "0712345678", dec!(250))
        .await
        .unwrap();

    let callback: banking_core::gateway::CallbackPayload =
        serde_json::from_value(serde_json::json!({
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "MR-1",
                    "CheckoutRequestID": request.checkout_request_id,
                    "ResultCode": 1032,
                    "ResultDesc": "Request cancelled by user"
                }
            }
        }))
        .unwrap();

    let action = processor.handle_callback(&callback).await.unwrap();
    assert_eq!(action, ReconcileAction::NoLedgerEffect);
    assert_eq!(account_balance(&pool, account.id).await, dec!(100));
    assert_eq!(
        settlement_status(&pool, &request.checkout_request_id).await,
        SettlementStatus::Cancelled
    );

    common::cleanup(&pool).await;
}

#[tokio::test]
async fn test_periodic_resolution_completes_pending_request() {
    let Some(pool) = common::try_pool().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };
    common::cleanup(&pool).await;

    let gateway = common::StubGateway::new();
    let adapter = MobileMoneyAdapter::new(pool.clone(), gateway.clone());
    let processor = processor(&pool, gateway.clone());

    let account = common::create_account(&pool, dec!(0)).await;
    let request = adapter
        .initiate_deposit(account.id, "0712345678", dec!(75))
        .await
        .unwrap();

    // First pass: gateway still processing, request stays PENDING.
    gateway.push_status(GatewayOutcome::StillPending).await;
    let applied = processor.resolve_pending().await.unwrap();
    assert_eq!(applied, 0);
    assert_eq!(
        settlement_status(&pool, &request.checkout_request_id).await,
        SettlementStatus::Pending
    );

    // Second pass: success resolves and credits.
    gateway
        .push_status(GatewayOutcome::Completed {
            receipt_number: Some("QBC12345".to_string()),
        })
        .await;
    let applied = processor.resolve_pending().await.unwrap();
    assert_eq!(applied, 1);
    assert_eq!(account_balance(&pool, account.id).await, dec!(75));

    common::cleanup(&pool).await;
}

#[tokio::test]
async fn test_withdrawal_completion_debits_account() {
    let Some(pool) = common::try_pool().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };
    common::cleanup(&pool).await;

    let gateway = common::StubGateway::new();
    let adapter = MobileMoneyAdapter::new(pool.clone(), gateway.clone());
    let processor = processor(&pool, gateway.clone());

    let account = common::create_account(&pool, dec!(500)).await;
    let request = adapter
        .initiate_withdrawal(account.id, "0712345678", dec!(200))
        .await
        .unwrap();

    // Initiation itself does not touch the ledger.
    assert_eq!(account_balance(&pool, account.id).await, dec!(500));

    gateway
        .push_status(GatewayOutcome::Completed {
            receipt_number: Some("QBC99999".to_string()),
        })
        .await;
    processor.resolve_pending().await.unwrap();

    assert_eq!(account_balance(&pool, account.id).await, dec!(300));
    assert_eq!(
        settlement_status(&pool, &request.checkout_request_id).await,
        SettlementStatus::Completed
    );

    common::cleanup(&pool).await;
}

#[tokio::test]
async fn test_reversal_sweep_compensates_completed_deposit() {
    let Some(pool) = common::try_pool().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };
    common::cleanup(&pool).await;

    let gateway = common::StubGateway::new();
    let adapter = MobileMoneyAdapter::new(pool.clone(), gateway.clone());
    let processor = processor(&pool, gateway.clone());

    let account = common::create_account(&pool, dec!(0)).await;
    let request = adapter
        .initiate_deposit(account.id, "0712345678", dec!(120))
        .await
        .unwrap();

    let callback = success_callback(&request.checkout_request_id, "RVT11111");
    processor.handle_callback(&callback).await.unwrap();
    assert_eq!(account_balance(&pool, account.id).await, dec!(120));

    // Gateway later reverses the deposit on its side.
    gateway.mark_receipt_reversed("RVT11111").await;
    let reversed = processor.sweep_reversals().await.unwrap();
    assert_eq!(reversed, 1);

    assert_eq!(account_balance(&pool, account.id).await, dec!(0));
    assert_eq!(
        settlement_status(&pool, &request.checkout_request_id).await,
        SettlementStatus::Reversed
    );

    // A second sweep finds nothing left to compensate.
    let reversed = processor.sweep_reversals().await.unwrap();
    assert_eq!(reversed, 0);

    common::cleanup(&pool).await;
}

#[tokio::test]
async fn test_invalid_phone_fails_before_any_side_effect() {
    let Some(pool) = common::try_pool().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };
    common::cleanup(&pool).await;

    let gateway = common::StubGateway::new();
    let adapter = MobileMoneyAdapter::new(pool.clone(), gateway.clone());

    let account = common::create_account(&pool, dec!(100)).await;

    let err = adapter
        .initiate_deposit(account.id, "12345", dec!(50))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        banking_core::error::AppError::InvalidExternalAccount(_)
    ));

    let tracked: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mobile_money_requests")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(tracked, 0);

    common::cleanup(&pool).await;
}
