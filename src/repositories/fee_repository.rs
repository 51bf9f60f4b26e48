use sqlx::PgPool;

use super::PgTx;
use crate::error::Result;
use crate::fees::FeeSchedule;
use crate::models::{FeeRecord, FeeRule};

/// Repository for the fee rate table and collected-fee records.
pub struct FeeRepository {
    pool: PgPool,
}

impl FeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads all active rules into an in-memory schedule for pure lookup.
    pub async fn load_schedule(&self) -> Result<FeeSchedule> {
        let rules = sqlx::query_as::<_, FeeRule>(
            r#"
            SELECT id, category, min_amount, max_amount, fee_amount, fee_percentage, active, created_at
            FROM fee_rules
            WHERE active = TRUE
            ORDER BY category, min_amount
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(FeeSchedule::new(rules))
    }

    pub async fn insert_rule(&self, rule: &FeeRule) -> Result<FeeRule> {
        let row = sqlx::query_as::<_, FeeRule>(
            r#"
            INSERT INTO fee_rules (id, category, min_amount, max_amount, fee_amount, fee_percentage, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, category, min_amount, max_amount, fee_amount, fee_percentage, active, created_at
            "#,
        )
        .bind(rule.id)
        .bind(rule.category)
        .bind(rule.min_amount)
        .bind(rule.max_amount)
        .bind(rule.fee_amount)
        .bind(rule.fee_percentage)
        .bind(rule.active)
        .bind(rule.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Records a collected fee inside the same DB transaction as the ledger
    /// entries it belongs to.
    pub async fn insert_record(&self, tx: &mut PgTx<'_>, record: &FeeRecord) -> Result<FeeRecord> {
        let row = sqlx::query_as::<_, FeeRecord>(
            r#"
            INSERT INTO fee_records (id, transaction_id, fee_rule_id, amount, profit_account_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, transaction_id, fee_rule_id, amount, profit_account_id, created_at
            "#,
        )
        .bind(record.id)
        .bind(record.transaction_id)
        .bind(record.fee_rule_id)
        .bind(record.amount)
        .bind(record.profit_account_id)
        .bind(record.created_at)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }
}
