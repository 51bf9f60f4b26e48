use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    TransferIn,
    TransferOut,
    CardPayment,
    BillPayment,
    LoanDisbursement,
    LoanPayment,
    FeeDebit,
    FeeIncome,
    ReversalCredit,
    ReversalDebit,
}

impl TransactionType {
    /// True when this entry increases the account's balance.
    pub fn is_credit(&self) -> bool {
        matches!(
            self,
            TransactionType::Deposit
                | TransactionType::TransferIn
                | TransactionType::LoanDisbursement
                | TransactionType::FeeIncome
                | TransactionType::ReversalCredit
        )
    }

    /// True for entry kinds a customer may dispute through the reversal
    /// workflow.
    pub fn is_reversible(&self) -> bool {
        matches!(
            self,
            TransactionType::TransferOut
                | TransactionType::TransferIn
                | TransactionType::CardPayment
                | TransactionType::BillPayment
        )
    }
}

/// Lifecycle status of a ledger entry. The only mutation permitted after an
/// entry is written is COMPLETED -> REVERSED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Reversed,
}

impl TransactionStatus {
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Completed | TransactionStatus::Failed | TransactionStatus::Reversed
        )
    }

    pub fn can_be_reversed(&self) -> bool {
        matches!(self, TransactionStatus::Completed)
    }
}

/// An entry in the append-only ledger.
///
/// Entries are never deleted and their amount is never mutated;
/// `balance_after` snapshots the account balance immediately after the entry
/// was applied, so replaying an account's entries in order must reproduce
/// the stored balance.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub transaction_type: TransactionType,
    /// Always positive; direction comes from `transaction_type`.
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub from_account_id: Option<Uuid>,
    pub to_account_id: Option<Uuid>,
    /// Human-readable support reference. Both legs of a transfer share one.
    pub reference: String,
    pub status: TransactionStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        account_id: Uuid,
        transaction_type: TransactionType,
        amount: Decimal,
        balance_after: Decimal,
        reference: String,
        description: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            transaction_type,
            amount,
            balance_after,
            from_account_id: None,
            to_account_id: None,
            reference,
            status: TransactionStatus::Completed,
            description,
            created_at: Utc::now(),
        }
    }

    pub fn with_parties(mut self, from: Uuid, to: Uuid) -> Self {
        self.from_account_id = Some(from);
        self.to_account_id = Some(to);
        self
    }

    /// Signed effect of this entry on the account balance.
    pub fn signed_amount(&self) -> Decimal {
        if self.transaction_type.is_credit() {
            self.amount
        } else {
            -self.amount
        }
    }

    /// Generates a support reference like `TXN-9F2C41D8A1B04E7F`.
    pub fn generate_reference(prefix: &str) -> String {
        let id = Uuid::new_v4().simple().to_string().to_uppercase();
        format!("{}-{}", prefix, &id[..16])
    }
}

/// Folds entries (ordered by creation) into a final balance starting from
/// `opening`. Used to verify the replay invariant.
pub fn replay_balance(opening: Decimal, entries: &[Transaction]) -> Decimal {
    entries
        .iter()
        .fold(opening, |acc, entry| acc + entry.signed_amount())
}

/// Checks the replay invariant over an ordered entry list: starting from
/// the opening balance implied by the first entry, every entry's
/// `balance_after` must equal the running sum of signed amounts. An empty
/// history is vacuously consistent.
pub fn verify_chain(entries: &[Transaction]) -> bool {
    let Some(first) = entries.first() else {
        return true;
    };

    let opening = first.balance_after - first.signed_amount();
    let mut running = opening;
    for entry in entries {
        running += entry.signed_amount();
        if running != entry.balance_after {
            return false;
        }
    }
    true
}
