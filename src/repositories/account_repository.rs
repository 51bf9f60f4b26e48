use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::PgTx;
use crate::error::{AppError, Result};
use crate::models::{Account, AccountStatus};

const ACCOUNT_COLUMNS: &str = "id, customer_id, account_number, currency, balance, \
     available_balance, status, version, last_transaction_at, created_at, updated_at";

/// Repository for account rows. All balance mutations go through
/// `lock_for_update` + `persist_balances` inside one DB transaction, so
/// concurrent read-modify-writes on the same account serialize on the row
/// lock instead of racing.
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, account: &Account) -> Result<Account> {
        let row = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (id, customer_id, account_number, currency, balance, available_balance, status, version, last_transaction_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ACCOUNT_COLUMNS}
            "#,
        ))
        .bind(account.id)
        .bind(account.customer_id)
        .bind(&account.account_number)
        .bind(&account.currency)
        .bind(account.balance)
        .bind(account.available_balance)
        .bind(account.status)
        .bind(account.version)
        .bind(account.last_transaction_at)
        .bind(account.created_at)
        .bind(account.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn find_by_number(&self, account_number: &str) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_number = $1"
        ))
        .bind(account_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Fetches an account inside `tx` with a row-level lock (`FOR UPDATE`).
    /// The lock is held until the surrounding transaction commits or rolls
    /// back, which linearizes balance mutations per account.
    pub async fn lock_for_update(&self, tx: &mut PgTx<'_>, id: Uuid) -> Result<Account> {
        let row = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        row.ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }

    /// Writes back both balance fields for a row previously locked with
    /// `lock_for_update`. Bumps the optimistic version counter.
    pub async fn persist_balances(
        &self,
        tx: &mut PgTx<'_>,
        id: Uuid,
        balance: Decimal,
        available_balance: Decimal,
    ) -> Result<Account> {
        let row = sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE accounts
            SET balance = $2,
                available_balance = $3,
                version = version + 1,
                last_transaction_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(balance)
        .bind(available_balance)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    pub async fn update_status(&self, id: Uuid, status: AccountStatus) -> Result<Account> {
        let row = sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE accounts
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }
}
