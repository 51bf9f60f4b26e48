use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::fees::FeeAssessment;
use crate::models::{Account, FeeRecord, Transaction, TransactionType};
use crate::models::transaction::verify_chain;
use crate::repositories::{AccountRepository, FeeRepository, PgTx, TransactionRepository};

/// Result of a single-account ledger mutation.
#[derive(Debug, Clone)]
pub struct Posting {
    pub entry: Transaction,
    pub account: Account,
    pub fee_charged: Decimal,
}

/// Result of a two-legged transfer. Both legs share `reference`.
#[derive(Debug, Clone)]
pub struct TransferPosting {
    pub out_entry: Transaction,
    pub in_entry: Transaction,
    pub from_account: Account,
    pub to_account: Account,
    pub fee_charged: Decimal,
    pub reference: String,
}

/// The ledger engine: every balance change happens here, inside one DB
/// transaction that locks the affected account rows, writes the new
/// balances and appends the matching ledger entries.
///
/// Lock ordering: customer accounts in ascending id order, the profit
/// account always last. This keeps concurrent transfers deadlock-free.
pub struct LedgerService {
    pool: PgPool,
    accounts: AccountRepository,
    transactions: TransactionRepository,
    fees: FeeRepository,
    profit_account_id: Uuid,
}

impl LedgerService {
    pub fn new(pool: PgPool, profit_account_id: Uuid) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            transactions: TransactionRepository::new(pool.clone()),
            fees: FeeRepository::new(pool.clone()),
            pool,
            profit_account_id,
        }
    }

    /// Credits an account and appends one ledger entry.
    pub async fn credit(
        &self,
        account_id: Uuid,
        amount: Decimal,
        transaction_type: TransactionType,
        description: Option<String>,
    ) -> Result<Posting> {
        validate_amount(amount)?;
        debug_assert!(transaction_type.is_credit());

        let mut tx = self.pool.begin().await?;

        let mut account = self.accounts.lock_for_update(&mut tx, account_id).await?;
        ensure_operational(&account)?;
        account.credit(amount);

        let account = self
            .accounts
            .persist_balances(&mut tx, account_id, account.balance, account.available_balance)
            .await?;

        let entry = Transaction::new(
            account_id,
            transaction_type,
            amount,
            account.balance,
            Transaction::generate_reference("TXN"),
            description,
        );
        let entry = self.transactions.insert(&mut tx, &entry).await?;

        tx.commit().await?;
        metrics::counter!("ledger_entries_total", "type" => "credit").increment(1);

        Ok(Posting {
            entry,
            account,
            fee_charged: Decimal::ZERO,
        })
    }

    /// Debits an account, assesses the given fee, and appends the main entry
    /// plus (when the fee is non-zero) a FEE_DEBIT entry on the customer and
    /// a FEE_INCOME entry on the profit account linked through a FeeRecord.
    ///
    /// Fails with `InsufficientFunds` before any write when
    /// `amount + fee` exceeds the available balance.
    pub async fn debit(
        &self,
        account_id: Uuid,
        amount: Decimal,
        fee: FeeAssessment,
        transaction_type: TransactionType,
        description: Option<String>,
    ) -> Result<Posting> {
        validate_amount(amount)?;
        debug_assert!(!transaction_type.is_credit());

        let mut tx = self.pool.begin().await?;

        let mut account = self.accounts.lock_for_update(&mut tx, account_id).await?;
        ensure_operational(&account)?;

        // One debit covers amount + fee; fails before any write when the
        // available balance cannot cover both.
        account.debit(amount + fee.amount)?;

        let account = self
            .accounts
            .persist_balances(&mut tx, account_id, account.balance, account.available_balance)
            .await?;

        let reference = Transaction::generate_reference("TXN");

        // Main entry carries the pre-fee amount; its balance_after excludes
        // the fee debit that follows it in replay order.
        let entry = Transaction::new(
            account_id,
            transaction_type,
            amount,
            account.balance + fee.amount,
            reference.clone(),
            description,
        );
        let entry = self.transactions.insert(&mut tx, &entry).await?;

        if fee.amount > Decimal::ZERO {
            self.post_fee(&mut tx, account_id, &account, &entry, &fee, &reference)
                .await?;
        }

        tx.commit().await?;
        metrics::counter!("ledger_entries_total", "type" => "debit").increment(1);

        Ok(Posting {
            entry,
            account,
            fee_charged: fee.amount,
        })
    }

    /// Moves `amount` from one account to another atomically: the source is
    /// debited `amount + fee`, the destination credited `amount`, and the
    /// two entries share one reference. A failed lookup or insufficient
    /// funds rolls back the whole transaction with no partial effect.
    pub async fn transfer(
        &self,
        from_account_id: Uuid,
        to_account_id: Uuid,
        amount: Decimal,
        fee: FeeAssessment,
        description: Option<String>,
    ) -> Result<TransferPosting> {
        validate_amount(amount)?;
        if from_account_id == to_account_id {
            return Err(AppError::Validation(
                "Source and destination accounts must be different".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        // Ascending-id order so two opposing transfers cannot deadlock.
        let (mut from, mut to) = if from_account_id < to_account_id {
            let from = self.accounts.lock_for_update(&mut tx, from_account_id).await?;
            let to = self.accounts.lock_for_update(&mut tx, to_account_id).await?;
            (from, to)
        } else {
            let to = self.accounts.lock_for_update(&mut tx, to_account_id).await?;
            let from = self.accounts.lock_for_update(&mut tx, from_account_id).await?;
            (from, to)
        };

        ensure_operational(&from)?;
        ensure_operational(&to)?;

        from.debit(amount + fee.amount)?;
        to.credit(amount);

        let from = self
            .accounts
            .persist_balances(&mut tx, from_account_id, from.balance, from.available_balance)
            .await?;
        let to = self
            .accounts
            .persist_balances(&mut tx, to_account_id, to.balance, to.available_balance)
            .await?;

        let reference = Transaction::generate_reference("TXN");

        let out_entry = Transaction::new(
            from_account_id,
            TransactionType::TransferOut,
            amount,
            from.balance + fee.amount,
            reference.clone(),
            description.clone(),
        )
        .with_parties(from_account_id, to_account_id);
        let out_entry = self.transactions.insert(&mut tx, &out_entry).await?;

        let in_entry = Transaction::new(
            to_account_id,
            TransactionType::TransferIn,
            amount,
            to.balance,
            reference.clone(),
            description,
        )
        .with_parties(from_account_id, to_account_id);
        let in_entry = self.transactions.insert(&mut tx, &in_entry).await?;

        if fee.amount > Decimal::ZERO {
            self.post_fee(&mut tx, from_account_id, &from, &out_entry, &fee, &reference)
                .await?;
        }

        tx.commit().await?;
        metrics::counter!("ledger_entries_total", "type" => "transfer").increment(2);

        Ok(TransferPosting {
            out_entry,
            in_entry,
            from_account: from,
            to_account: to,
            fee_charged: fee.amount,
            reference,
        })
    }

    /// Writes the customer-side FEE_DEBIT entry, credits the profit account
    /// (locked last, see lock-ordering note on the type), and records the
    /// FeeRecord linking the fee to the entry that incurred it.
    ///
    /// Assumes the fee was already debited from the customer balance by the
    /// caller (as part of `amount + fee`).
    async fn post_fee(
        &self,
        tx: &mut PgTx<'_>,
        customer_account_id: Uuid,
        customer_account: &Account,
        main_entry: &Transaction,
        fee: &FeeAssessment,
        reference: &str,
    ) -> Result<()> {
        let fee_entry = Transaction::new(
            customer_account_id,
            TransactionType::FeeDebit,
            fee.amount,
            customer_account.balance,
            reference.to_string(),
            Some(format!("fee for {}", main_entry.reference)),
        );
        self.transactions.insert(tx, &fee_entry).await?;

        let mut profit = self
            .accounts
            .lock_for_update(tx, self.profit_account_id)
            .await?;
        profit.credit(fee.amount);
        let profit = self
            .accounts
            .persist_balances(tx, self.profit_account_id, profit.balance, profit.available_balance)
            .await?;

        let income_entry = Transaction::new(
            self.profit_account_id,
            TransactionType::FeeIncome,
            fee.amount,
            profit.balance,
            reference.to_string(),
            Some(format!("fee income for {}", main_entry.reference)),
        );
        self.transactions.insert(tx, &income_entry).await?;

        let record = FeeRecord::new(main_entry.id, fee.rule_id, fee.amount, self.profit_account_id);
        self.fees.insert_record(tx, &record).await?;

        Ok(())
    }

    /// Verifies the balance replay invariant for an account: its entry
    /// chain must be internally consistent, and the last entry's
    /// `balance_after` must match the stored balance.
    pub async fn verify_replay(&self, account_id: Uuid) -> Result<bool> {
        let account = self
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))?;

        let entries = self
            .transactions
            .find_by_account_chronological(account_id)
            .await?;

        if !verify_chain(&entries) {
            return Ok(false);
        }

        Ok(entries
            .last()
            .map_or(true, |last| last.balance_after == account.balance))
    }

    pub fn profit_account_id(&self) -> Uuid {
        self.profit_account_id
    }
}

fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation("Amount must be positive".to_string()));
    }
    Ok(())
}

fn ensure_operational(account: &Account) -> Result<()> {
    if !account.is_operational() {
        return Err(AppError::Validation(format!(
            "Account '{}' is not operational (status: {:?})",
            account.id, account.status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(dec!(0.01)).is_ok());
        assert!(validate_amount(Decimal::ZERO).is_err());
        assert!(validate_amount(dec!(-5)).is_err());
    }

    #[test]
    fn test_ensure_operational() {
        let mut account = Account::new(
            Uuid::new_v4(),
            "0001000001".to_string(),
            "KES".to_string(),
        );
        assert!(ensure_operational(&account).is_ok());

        account.status = crate::models::AccountStatus::Frozen;
        assert!(ensure_operational(&account).is_err());
    }
}
