use sqlx::PgPool;
use uuid::Uuid;

use super::PgTx;
use crate::error::Result;
use crate::models::{MobileMoneyRequest, SettlementStatus};

const SETTLEMENT_COLUMNS: &str = "id, merchant_request_id, checkout_request_id, phone_number, \
     account_id, direction, amount, status, receipt_number, result_code, result_description, \
     created_at, updated_at";

/// Repository for mobile-money settlement requests.
///
/// The exactly-once contract lives here: every transition out of PENDING is
/// a conditional UPDATE guarded on the current status, so a duplicate
/// callback or a callback racing the poller finds zero rows and applies no
/// second ledger effect.
pub struct SettlementRepository {
    pool: PgPool,
}

impl SettlementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &MobileMoneyRequest) -> Result<MobileMoneyRequest> {
        let row = sqlx::query_as::<_, MobileMoneyRequest>(&format!(
            r#"
            INSERT INTO mobile_money_requests (id, merchant_request_id, checkout_request_id, phone_number, account_id, direction, amount, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {SETTLEMENT_COLUMNS}
            "#,
        ))
        .bind(request.id)
        .bind(&request.merchant_request_id)
        .bind(&request.checkout_request_id)
        .bind(&request.phone_number)
        .bind(request.account_id)
        .bind(request.direction)
        .bind(request.amount)
        .bind(request.status)
        .bind(request.created_at)
        .bind(request.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<MobileMoneyRequest>> {
        let row = sqlx::query_as::<_, MobileMoneyRequest>(&format!(
            "SELECT {SETTLEMENT_COLUMNS} FROM mobile_money_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn find_by_checkout_id(
        &self,
        checkout_request_id: &str,
    ) -> Result<Option<MobileMoneyRequest>> {
        let row = sqlx::query_as::<_, MobileMoneyRequest>(&format!(
            "SELECT {SETTLEMENT_COLUMNS} FROM mobile_money_requests WHERE checkout_request_id = $1"
        ))
        .bind(checkout_request_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_by_status(&self, status: SettlementStatus) -> Result<Vec<MobileMoneyRequest>> {
        let rows = sqlx::query_as::<_, MobileMoneyRequest>(&format!(
            "SELECT {SETTLEMENT_COLUMNS} FROM mobile_money_requests WHERE status = $1 ORDER BY created_at"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// PENDING -> COMPLETED. Returns None when the request was already
    /// resolved; the caller must then skip the ledger effect.
    pub async fn mark_completed(
        &self,
        tx: &mut PgTx<'_>,
        id: Uuid,
        receipt_number: &str,
        result_code: i32,
        result_description: &str,
    ) -> Result<Option<MobileMoneyRequest>> {
        let row = sqlx::query_as::<_, MobileMoneyRequest>(&format!(
            r#"
            UPDATE mobile_money_requests
            SET status = $2, receipt_number = $3, result_code = $4, result_description = $5, updated_at = NOW()
            WHERE id = $1 AND status = $6
            RETURNING {SETTLEMENT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(SettlementStatus::Completed)
        .bind(receipt_number)
        .bind(result_code)
        .bind(result_description)
        .bind(SettlementStatus::Pending)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row)
    }

    /// PENDING -> CANCELLED / TIMEOUT / FAILED. No ledger effect is ever
    /// attached to these, so a plain guarded update on the pool suffices.
    pub async fn mark_failed(
        &self,
        id: Uuid,
        status: SettlementStatus,
        result_code: i32,
        result_description: &str,
    ) -> Result<Option<MobileMoneyRequest>> {
        debug_assert!(matches!(
            status,
            SettlementStatus::Cancelled | SettlementStatus::Timeout | SettlementStatus::Failed
        ));

        let row = sqlx::query_as::<_, MobileMoneyRequest>(&format!(
            r#"
            UPDATE mobile_money_requests
            SET status = $2, result_code = $3, result_description = $4, updated_at = NOW()
            WHERE id = $1 AND status = $5
            RETURNING {SETTLEMENT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(status)
        .bind(result_code)
        .bind(result_description)
        .bind(SettlementStatus::Pending)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// COMPLETED -> REVERSED, inside the DB transaction that writes the
    /// compensating ledger entry.
    pub async fn mark_reversed(
        &self,
        tx: &mut PgTx<'_>,
        id: Uuid,
        result_description: &str,
    ) -> Result<Option<MobileMoneyRequest>> {
        let row = sqlx::query_as::<_, MobileMoneyRequest>(&format!(
            r#"
            UPDATE mobile_money_requests
            SET status = $2, result_description = $3, updated_at = NOW()
            WHERE id = $1 AND status = $4
            RETURNING {SETTLEMENT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(SettlementStatus::Reversed)
        .bind(result_description)
        .bind(SettlementStatus::Completed)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row)
    }
}
