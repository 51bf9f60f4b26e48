use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::fees::FeeAssessment;
use crate::models::{TransactionCategory, TransactionType};
use crate::repositories::{AccountRepository, CardRepository, FeeRepository};
use crate::services::ledger::LedgerService;
use crate::services::notifications::Notifier;
use crate::events::{NotificationEvent, NotificationKind};

/// What the caller gets back from a completed money movement: enough to
/// print a slip and to find the entry again in support.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Receipt {
    pub reference: String,
    pub new_balance: Decimal,
    pub fee_charged: Decimal,
    pub message: String,
}

/// One payment channel request: account-to-account transfer.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Decimal,
    pub description: Option<String>,
}

/// Card-present or card-not-present payment.
#[derive(Debug, Clone)]
pub struct CardPaymentRequest {
    pub card_id: Uuid,
    pub secret: String,
    pub amount: Decimal,
    pub merchant: String,
}

/// The payment engine: validates the instrument, prices the fee, hands the
/// movement to the ledger engine and emits a notification. All validation
/// happens before any ledger write, so failure paths need no rollback.
pub struct PaymentEngine {
    accounts: AccountRepository,
    cards: CardRepository,
    fees: FeeRepository,
    ledger: Arc<LedgerService>,
    notifier: Arc<dyn Notifier>,
}

impl PaymentEngine {
    pub fn new(pool: PgPool, ledger: Arc<LedgerService>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            cards: CardRepository::new(pool.clone()),
            fees: FeeRepository::new(pool),
            ledger,
            notifier,
        }
    }

    /// Teller/cash deposit. No fee.
    pub async fn deposit(&self, account_id: Uuid, amount: Decimal) -> Result<Receipt> {
        let posting = self
            .ledger
            .credit(account_id, amount, TransactionType::Deposit, Some("cash deposit".to_string()))
            .await?;

        self.notifier
            .notify(NotificationEvent::new(
                posting.account.customer_id,
                NotificationKind::DepositReceived,
                amount,
                posting.entry.reference.clone(),
            ))
            .await;

        Ok(receipt(&posting.entry.reference, posting.account.balance, Decimal::ZERO, "Deposit completed"))
    }

    /// Account-to-account transfer with fee assessment.
    pub async fn transfer(&self, request: TransferRequest) -> Result<Receipt> {
        let fee = self
            .assess_fee(TransactionCategory::Transfer, request.amount)
            .await?;

        let posting = self
            .ledger
            .transfer(
                request.from_account_id,
                request.to_account_id,
                request.amount,
                fee,
                request.description,
            )
            .await?;

        self.notifier
            .notify(NotificationEvent::new(
                posting.from_account.customer_id,
                NotificationKind::TransferSent,
                request.amount,
                posting.reference.clone(),
            ))
            .await;
        self.notifier
            .notify(NotificationEvent::new(
                posting.to_account.customer_id,
                NotificationKind::TransferReceived,
                request.amount,
                posting.reference.clone(),
            ))
            .await;

        Ok(receipt(
            &posting.reference,
            posting.from_account.balance,
            posting.fee_charged,
            "Transfer completed",
        ))
    }

    /// Card payment (POS or online). Validates the card before touching the
    /// ledger.
    pub async fn card_payment(&self, request: CardPaymentRequest) -> Result<Receipt> {
        let account_id = self.validate_card(request.card_id, &request.secret).await?;

        let fee = self
            .assess_fee(TransactionCategory::CardPayment, request.amount)
            .await?;

        let posting = self
            .ledger
            .debit(
                account_id,
                request.amount,
                fee,
                TransactionType::CardPayment,
                Some(format!("card payment to {}", request.merchant)),
            )
            .await?;

        self.notifier
            .notify(NotificationEvent::new(
                posting.account.customer_id,
                NotificationKind::CardPaymentCompleted,
                request.amount,
                posting.entry.reference.clone(),
            ))
            .await;

        Ok(receipt(
            &posting.entry.reference,
            posting.account.balance,
            posting.fee_charged,
            "Card payment completed",
        ))
    }

    /// ATM cash withdrawal through a card.
    pub async fn atm_withdrawal(
        &self,
        card_id: Uuid,
        secret: &str,
        amount: Decimal,
    ) -> Result<Receipt> {
        let account_id = self.validate_card(card_id, secret).await?;

        let fee = self
            .assess_fee(TransactionCategory::AtmWithdrawal, amount)
            .await?;

        let posting = self
            .ledger
            .debit(
                account_id,
                amount,
                fee,
                TransactionType::Withdrawal,
                Some("ATM withdrawal".to_string()),
            )
            .await?;

        self.notifier
            .notify(NotificationEvent::new(
                posting.account.customer_id,
                NotificationKind::WithdrawalCompleted,
                amount,
                posting.entry.reference.clone(),
            ))
            .await;

        Ok(receipt(
            &posting.entry.reference,
            posting.account.balance,
            posting.fee_charged,
            "Withdrawal completed",
        ))
    }

    /// Bill payment from an account to a named biller.
    pub async fn bill_payment(
        &self,
        account_id: Uuid,
        biller: &str,
        amount: Decimal,
    ) -> Result<Receipt> {
        let fee = self
            .assess_fee(TransactionCategory::BillPayment, amount)
            .await?;

        let posting = self
            .ledger
            .debit(
                account_id,
                amount,
                fee,
                TransactionType::BillPayment,
                Some(format!("bill payment to {biller}")),
            )
            .await?;

        self.notifier
            .notify(NotificationEvent::new(
                posting.account.customer_id,
                NotificationKind::BillPaymentCompleted,
                amount,
                posting.entry.reference.clone(),
            ))
            .await;

        Ok(receipt(
            &posting.entry.reference,
            posting.account.balance,
            posting.fee_charged,
            "Bill payment completed",
        ))
    }

    /// Credits a loan principal to the customer account. No fee.
    pub async fn loan_disbursement(&self, account_id: Uuid, amount: Decimal) -> Result<Receipt> {
        let posting = self
            .ledger
            .credit(
                account_id,
                amount,
                TransactionType::LoanDisbursement,
                Some("loan disbursement".to_string()),
            )
            .await?;

        self.notifier
            .notify(NotificationEvent::new(
                posting.account.customer_id,
                NotificationKind::LoanDisbursed,
                amount,
                posting.entry.reference.clone(),
            ))
            .await;

        Ok(receipt(&posting.entry.reference, posting.account.balance, Decimal::ZERO, "Loan disbursed"))
    }

    /// Loan repayment out of the customer account.
    pub async fn loan_payment(&self, account_id: Uuid, amount: Decimal) -> Result<Receipt> {
        let fee = self
            .assess_fee(TransactionCategory::LoanPayment, amount)
            .await?;

        let posting = self
            .ledger
            .debit(
                account_id,
                amount,
                fee,
                TransactionType::LoanPayment,
                Some("loan payment".to_string()),
            )
            .await?;

        self.notifier
            .notify(NotificationEvent::new(
                posting.account.customer_id,
                NotificationKind::LoanPaymentReceived,
                amount,
                posting.entry.reference.clone(),
            ))
            .await;

        Ok(receipt(
            &posting.entry.reference,
            posting.account.balance,
            posting.fee_charged,
            "Loan payment completed",
        ))
    }

    async fn assess_fee(
        &self,
        category: TransactionCategory,
        amount: Decimal,
    ) -> Result<FeeAssessment> {
        let schedule = self.fees.load_schedule().await?;
        Ok(schedule.assess(category, amount))
    }

    /// Checks the card exists, is active, unexpired, and the secret matches.
    /// Returns the linked account id.
    async fn validate_card(&self, card_id: Uuid, secret: &str) -> Result<Uuid> {
        let card = self
            .cards
            .find_by_id(card_id)
            .await?
            .ok_or_else(|| AppError::CardNotFound(card_id.to_string()))?;

        card.validate_for_payment(secret, Utc::now())?;

        // The account must still exist and be resolvable before pricing.
        self.accounts
            .find_by_id(card.account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(card.account_id.to_string()))?;

        Ok(card.account_id)
    }
}

fn receipt(reference: &str, new_balance: Decimal, fee: Decimal, message: &str) -> Receipt {
    Receipt {
        reference: reference.to_string(),
        new_balance,
        fee_charged: fee,
        message: message.to_string(),
    }
}
