use sqlx::PgPool;
use uuid::Uuid;

use super::PgTx;
use crate::error::{AppError, Result};
use crate::models::{Transaction, TransactionStatus};

const TRANSACTION_COLUMNS: &str = "id, account_id, transaction_type, amount, balance_after, \
     from_account_id, to_account_id, reference, status, description, created_at";

/// Repository for the append-only ledger. Entries are inserted inside the
/// same DB transaction that moved the balance; nothing here ever updates an
/// amount, and the only status change allowed is COMPLETED -> REVERSED.
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, tx: &mut PgTx<'_>, entry: &Transaction) -> Result<Transaction> {
        let row = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            INSERT INTO transactions (id, account_id, transaction_type, amount, balance_after, from_account_id, to_account_id, reference, status, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {TRANSACTION_COLUMNS}
            "#,
        ))
        .bind(entry.id)
        .bind(entry.account_id)
        .bind(entry.transaction_type)
        .bind(entry.amount)
        .bind(entry.balance_after)
        .bind(entry.from_account_id)
        .bind(entry.to_account_id)
        .bind(&entry.reference)
        .bind(entry.status)
        .bind(&entry.description)
        .bind(entry.created_at)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>> {
        let row = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Both legs of a transfer share a reference, so this can return two rows.
    pub async fn find_by_reference(&self, reference: &str) -> Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE reference = $1 ORDER BY seq"
        ))
        .bind(reference)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn find_by_account(
        &self,
        account_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM transactions
            WHERE account_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        ))
        .bind(account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Entries for an account in application order, for replay verification.
    pub async fn find_by_account_chronological(&self, account_id: Uuid) -> Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE account_id = $1 ORDER BY seq"
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Marks a completed entry REVERSED. The status guard in the WHERE
    /// clause makes the operation idempotent and rejects entries that were
    /// never completed.
    pub async fn mark_reversed(&self, tx: &mut PgTx<'_>, id: Uuid) -> Result<Transaction> {
        let row = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            UPDATE transactions
            SET status = $2
            WHERE id = $1 AND status = $3
            RETURNING {TRANSACTION_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(TransactionStatus::Reversed)
        .bind(TransactionStatus::Completed)
        .fetch_optional(&mut **tx)
        .await?;

        row.ok_or_else(|| AppError::InvalidStateTransition {
            from: "non-COMPLETED".to_string(),
            to: "REVERSED".to_string(),
        })
    }
}
