use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Operational state of a customer account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    /// Account can send and receive money.
    Active,
    /// Account is frozen; no new transactions.
    Frozen,
    /// Account is permanently closed.
    Closed,
}

impl AccountStatus {
    pub fn is_operational(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }
}

/// A customer account.
///
/// `balance` is ledger truth; `available_balance` is what can be spent right
/// now. The two are equal except while a reversal hold is outstanding, and
/// `available_balance <= balance` must hold at all times. The `version`
/// column increments on every balance write as an optimistic guard on top of
/// the row-level locks the repositories take.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub account_number: String,
    pub currency: String,
    pub balance: Decimal,
    pub available_balance: Decimal,
    pub status: AccountStatus,
    pub version: i32,
    pub last_transaction_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(customer_id: Uuid, account_number: String, currency: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer_id,
            account_number,
            currency,
            balance: Decimal::ZERO,
            available_balance: Decimal::ZERO,
            status: AccountStatus::Active,
            version: 1,
            last_transaction_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_balance(mut self, amount: Decimal) -> Self {
        self.balance = amount;
        self.available_balance = amount;
        self
    }

    pub fn is_operational(&self) -> bool {
        self.status.is_operational()
    }

    pub fn has_available(&self, amount: Decimal) -> bool {
        self.available_balance >= amount
    }

    /// Amount currently held (reserved pending a reversal decision).
    pub fn held_amount(&self) -> Decimal {
        self.balance - self.available_balance
    }

    /// Credits both balance fields.
    pub fn credit(&mut self, amount: Decimal) {
        self.balance += amount;
        self.available_balance += amount;
        self.touch();
    }

    /// Debits both balance fields. Fails if the available balance would go
    /// negative; the account is left unchanged on failure.
    pub fn debit(&mut self, amount: Decimal) -> Result<()> {
        if !self.has_available(amount) {
            return Err(AppError::InsufficientFunds {
                requested: amount,
                available: self.available_balance,
            });
        }
        self.balance -= amount;
        self.available_balance -= amount;
        self.touch();
        Ok(())
    }

    /// Places a hold: reduces only `available_balance`, reserving funds
    /// pending a later decision.
    pub fn hold(&mut self, amount: Decimal) -> Result<()> {
        if !self.has_available(amount) {
            return Err(AppError::InsufficientAvailableBalance {
                requested: amount,
                available: self.available_balance,
            });
        }
        self.available_balance -= amount;
        self.touch();
        Ok(())
    }

    /// Releases a previously placed hold. Never raises `available_balance`
    /// above `balance`.
    pub fn release_hold(&mut self, amount: Decimal) {
        let release = amount.min(self.held_amount());
        self.available_balance += release;
        self.touch();
    }

    /// Consumes held funds: debits `balance` only, because the matching
    /// `available_balance` reduction was already applied by `hold`.
    pub fn debit_held(&mut self, amount: Decimal) -> Result<()> {
        if self.held_amount() < amount {
            return Err(AppError::InsufficientAvailableBalance {
                requested: amount,
                available: self.held_amount(),
            });
        }
        self.balance -= amount;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.version += 1;
        self.last_transaction_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }
}
