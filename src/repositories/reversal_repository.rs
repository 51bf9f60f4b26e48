use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::PgTx;
use crate::error::{AppError, Result};
use crate::models::{ReversalRequest, ReversalStatus};

const REVERSAL_COLUMNS: &str = "id, original_transaction_id, requested_by, amount, reason, \
     reversal_type, status, reviewed_by, review_notes, hold_account_id, hold_placed_at, \
     completed_at, created_at";

/// Repository for reversal requests. Status transitions are written with a
/// current-status guard in the WHERE clause so a stale actor (two reviewers
/// racing on the same request) cannot skip or repeat a step.
pub struct ReversalRepository {
    pool: PgPool,
}

impl ReversalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &ReversalRequest) -> Result<ReversalRequest> {
        let row = sqlx::query_as::<_, ReversalRequest>(&format!(
            r#"
            INSERT INTO reversal_requests (id, original_transaction_id, requested_by, amount, reason, reversal_type, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {REVERSAL_COLUMNS}
            "#,
        ))
        .bind(request.id)
        .bind(request.original_transaction_id)
        .bind(request.requested_by)
        .bind(request.amount)
        .bind(&request.reason)
        .bind(request.reversal_type)
        .bind(request.status)
        .bind(request.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ReversalRequest>> {
        let row = sqlx::query_as::<_, ReversalRequest>(&format!(
            "SELECT {REVERSAL_COLUMNS} FROM reversal_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_by_status(&self, status: ReversalStatus) -> Result<Vec<ReversalRequest>> {
        let rows = sqlx::query_as::<_, ReversalRequest>(&format!(
            "SELECT {REVERSAL_COLUMNS} FROM reversal_requests WHERE status = $1 ORDER BY created_at"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// PENDING -> APPROVED, recording the reviewer and which account the
    /// hold was taken from. Runs inside the same DB transaction as the hold.
    pub async fn approve(
        &self,
        tx: &mut PgTx<'_>,
        id: Uuid,
        reviewed_by: Uuid,
        hold_account_id: Uuid,
        hold_placed_at: DateTime<Utc>,
    ) -> Result<ReversalRequest> {
        let row = sqlx::query_as::<_, ReversalRequest>(&format!(
            r#"
            UPDATE reversal_requests
            SET status = $2, reviewed_by = $3, hold_account_id = $4, hold_placed_at = $5
            WHERE id = $1 AND status = $6
            RETURNING {REVERSAL_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(ReversalStatus::Approved)
        .bind(reviewed_by)
        .bind(hold_account_id)
        .bind(hold_placed_at)
        .bind(ReversalStatus::Pending)
        .fetch_optional(&mut **tx)
        .await?;

        row.ok_or_else(|| AppError::InvalidStateTransition {
            from: "non-PENDING".to_string(),
            to: "APPROVED".to_string(),
        })
    }

    /// PENDING or APPROVED -> REJECTED. The caller is responsible for
    /// releasing any hold in the same DB transaction.
    pub async fn reject(
        &self,
        tx: &mut PgTx<'_>,
        id: Uuid,
        expected_status: ReversalStatus,
        reviewed_by: Uuid,
        notes: &str,
    ) -> Result<ReversalRequest> {
        let row = sqlx::query_as::<_, ReversalRequest>(&format!(
            r#"
            UPDATE reversal_requests
            SET status = $2, reviewed_by = $3, review_notes = $4
            WHERE id = $1 AND status = $5
            RETURNING {REVERSAL_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(ReversalStatus::Rejected)
        .bind(reviewed_by)
        .bind(notes)
        .bind(expected_status)
        .fetch_optional(&mut **tx)
        .await?;

        row.ok_or_else(|| AppError::InvalidStateTransition {
            from: format!("non-{:?}", expected_status),
            to: "REJECTED".to_string(),
        })
    }

    /// APPROVED -> COMPLETED, stamping the completion time.
    pub async fn complete(&self, tx: &mut PgTx<'_>, id: Uuid) -> Result<ReversalRequest> {
        let row = sqlx::query_as::<_, ReversalRequest>(&format!(
            r#"
            UPDATE reversal_requests
            SET status = $2, completed_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING {REVERSAL_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(ReversalStatus::Completed)
        .bind(ReversalStatus::Approved)
        .fetch_optional(&mut **tx)
        .await?;

        row.ok_or_else(|| AppError::InvalidStateTransition {
            from: "non-APPROVED".to_string(),
            to: "COMPLETED".to_string(),
        })
    }
}
