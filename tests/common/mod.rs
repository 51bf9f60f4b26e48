#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::Mutex;
use uuid::Uuid;

use banking_core::error::{AppError, Result};
use banking_core::gateway::{GatewayOutcome, MobileMoneyGateway, PushInitiation};
use banking_core::models::Account;
use banking_core::repositories::AccountRepository;

/// Connects to the test database, or returns None (test passes vacuously)
/// when DATABASE_URL is not configured in the environment.
pub async fn try_pool() -> Option<PgPool> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

pub async fn cleanup(pool: &PgPool) {
    for table in [
        "fee_records",
        "reversal_requests",
        "mobile_money_requests",
        "cards",
        "transactions",
    ] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(pool)
            .await
            .ok();
    }
    // Keep the seeded profit account, drop everything else.
    sqlx::query("DELETE FROM accounts WHERE account_number <> '0001000001'")
        .execute(pool)
        .await
        .ok();
    sqlx::query("UPDATE accounts SET balance = 0, available_balance = 0 WHERE account_number = '0001000001'")
        .execute(pool)
        .await
        .ok();
}

pub async fn profit_account_id(pool: &PgPool) -> Uuid {
    AccountRepository::new(pool.clone())
        .find_by_number("0001000001")
        .await
        .expect("profit account lookup failed")
        .expect("profit account missing; run migrations")
        .id
}

pub async fn create_account(pool: &PgPool, balance: Decimal) -> Account {
    let account = Account::new(
        Uuid::new_v4(),
        format!("ACC{}", &Uuid::new_v4().simple().to_string()[..10]),
        "KES".to_string(),
    )
    .with_balance(balance);

    AccountRepository::new(pool.clone())
        .create(&account)
        .await
        .expect("Failed to create account")
}

/// Programmable in-memory gateway for integration tests.
pub struct StubGateway {
    pub status_outcomes: Mutex<Vec<GatewayOutcome>>,
    pub reversed_receipts: Mutex<Vec<String>>,
    counter: Mutex<u32>,
}

impl StubGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            status_outcomes: Mutex::new(Vec::new()),
            reversed_receipts: Mutex::new(Vec::new()),
            counter: Mutex::new(0),
        })
    }

    pub async fn push_status(&self, outcome: GatewayOutcome) {
        self.status_outcomes.lock().await.push(outcome);
    }

    pub async fn mark_receipt_reversed(&self, receipt: &str) {
        self.reversed_receipts.lock().await.push(receipt.to_string());
    }
}

#[async_trait]
impl MobileMoneyGateway for StubGateway {
    async fn initiate_push(
        &self,
        _phone_number: &str,
        _amount: Decimal,
        _account_reference: &str,
    ) -> Result<PushInitiation> {
        let mut counter = self.counter.lock().await;
        *counter += 1;
        Ok(PushInitiation {
            merchant_request_id: format!("MR-{counter}"),
            checkout_request_id: format!("ws_CO_TEST_{counter}"),
            customer_message: "Success. Request accepted for processing".to_string(),
        })
    }

    async fn initiate_payout(
        &self,
        _phone_number: &str,
        _amount: Decimal,
        _remarks: &str,
    ) -> Result<PushInitiation> {
        let mut counter = self.counter.lock().await;
        *counter += 1;
        Ok(PushInitiation {
            merchant_request_id: format!("MR-{counter}"),
            checkout_request_id: format!("ws_CO_TEST_{counter}"),
            customer_message: "Accept the service request successfully.".to_string(),
        })
    }

    async fn query_status(&self, _checkout_request_id: &str) -> Result<GatewayOutcome> {
        let mut outcomes = self.status_outcomes.lock().await;
        if outcomes.is_empty() {
            return Err(AppError::GatewayUnavailable("no stubbed outcome".to_string()));
        }
        Ok(outcomes.remove(0))
    }

    async fn query_reversal(&self, receipt_number: &str) -> Result<bool> {
        Ok(self
            .reversed_receipts
            .lock()
            .await
            .iter()
            .any(|r| r == receipt_number))
    }
}
