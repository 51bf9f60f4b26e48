use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::events::{NotificationEvent, NotificationKind};
use crate::models::{
    Account, ReversalRequest, ReversalStatus, ReversalType, Transaction, TransactionType,
};
use crate::repositories::{AccountRepository, PgTx, ReversalRepository, TransactionRepository};
use crate::services::notifications::Notifier;

/// The reversal workflow: a request/approve/complete state machine over a
/// previously completed transaction.
///
/// Approve places a hold (available balance only) on the party the money
/// will come from; Complete moves the held funds between the original
/// parties and marks the original entry REVERSED. Every funds-affecting
/// step runs in one DB transaction with the account rows locked, so a
/// failure leaves the request in its prior state with no partial hold.
pub struct ReversalService {
    pool: PgPool,
    accounts: AccountRepository,
    transactions: TransactionRepository,
    reversals: ReversalRepository,
    notifier: Arc<dyn Notifier>,
}

impl ReversalService {
    pub fn new(pool: PgPool, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            transactions: TransactionRepository::new(pool.clone()),
            reversals: ReversalRepository::new(pool.clone()),
            pool,
            notifier,
        }
    }

    /// Creates a PENDING request against a completed, reversible transaction.
    /// No funds are affected yet.
    pub async fn create(
        &self,
        original_transaction_id: Uuid,
        requested_by: Uuid,
        amount: Option<Decimal>,
        reason: String,
        reversal_type: ReversalType,
    ) -> Result<ReversalRequest> {
        let original = self.load_original(original_transaction_id).await?;

        if !original.status.can_be_reversed() {
            return Err(AppError::Validation(format!(
                "Transaction '{}' has status {:?} and cannot be reversed",
                original.id, original.status
            )));
        }
        if !original.transaction_type.is_reversible() {
            return Err(AppError::Validation(format!(
                "Transaction type {:?} cannot be reversed",
                original.transaction_type
            )));
        }

        let amount = amount.unwrap_or(original.amount);
        if amount <= Decimal::ZERO || amount > original.amount {
            return Err(AppError::Validation(format!(
                "Reversal amount {} must be positive and not exceed the original amount {}",
                amount, original.amount
            )));
        }

        let request = ReversalRequest::new(
            original.id,
            requested_by,
            amount,
            reason,
            reversal_type,
        );
        let request = self.reversals.create(&request).await?;

        info!(reversal_id = %request.id, original = %original.id, "reversal request created");
        Ok(request)
    }

    /// PENDING -> APPROVED. Determines the hold party from the reversal
    /// type, reduces only its available balance, and records which account
    /// the hold came from. Fails with `InsufficientAvailableBalance` and no
    /// state change if the party cannot cover the hold.
    pub async fn approve(&self, reversal_id: Uuid, reviewed_by: Uuid) -> Result<ReversalRequest> {
        let request = self.load_request(reversal_id).await?;
        self.require_status(&request, ReversalStatus::Pending, ReversalStatus::Approved)?;

        let original = self.load_original(request.original_transaction_id).await?;
        let hold_account_id = hold_party(&request, &original)?;

        let mut tx = self.pool.begin().await?;

        let mut account = self.accounts.lock_for_update(&mut tx, hold_account_id).await?;
        account.hold(request.amount)?;
        self.accounts
            .persist_balances(&mut tx, hold_account_id, account.balance, account.available_balance)
            .await?;

        let request = self
            .reversals
            .approve(&mut tx, reversal_id, reviewed_by, hold_account_id, Utc::now())
            .await?;

        tx.commit().await?;
        metrics::counter!("reversals_total", "action" => "approve").increment(1);

        self.notifier
            .notify(NotificationEvent::new(
                request.requested_by,
                NotificationKind::ReversalApproved,
                request.amount,
                request.id.to_string(),
            ))
            .await;

        Ok(request)
    }

    /// PENDING -> REJECTED. Records the reason; no funds were held yet.
    pub async fn reject(
        &self,
        reversal_id: Uuid,
        reviewed_by: Uuid,
        notes: String,
    ) -> Result<ReversalRequest> {
        let request = self.load_request(reversal_id).await?;
        self.require_status(&request, ReversalStatus::Pending, ReversalStatus::Rejected)?;

        let mut tx = self.pool.begin().await?;
        let request = self
            .reversals
            .reject(&mut tx, reversal_id, ReversalStatus::Pending, reviewed_by, &notes)
            .await?;
        tx.commit().await?;

        self.notifier
            .notify(NotificationEvent::new(
                request.requested_by,
                NotificationKind::ReversalRejected,
                request.amount,
                request.id.to_string(),
            ))
            .await;

        Ok(request)
    }

    /// Explicit release path for an APPROVED request that will never be
    /// completed: releases the hold and closes the request as REJECTED.
    /// This is a deliberate operator action; holds never expire on their own.
    pub async fn release_hold(
        &self,
        reversal_id: Uuid,
        reviewed_by: Uuid,
        notes: String,
    ) -> Result<ReversalRequest> {
        let request = self.load_request(reversal_id).await?;
        self.require_status(&request, ReversalStatus::Approved, ReversalStatus::Rejected)?;

        let hold_account_id = request
            .hold_account_id
            .ok_or_else(|| AppError::Validation("Approved request has no hold account".to_string()))?;

        let mut tx = self.pool.begin().await?;

        let mut account = self.accounts.lock_for_update(&mut tx, hold_account_id).await?;
        account.release_hold(request.amount);
        self.accounts
            .persist_balances(&mut tx, hold_account_id, account.balance, account.available_balance)
            .await?;

        let request = self
            .reversals
            .reject(&mut tx, reversal_id, ReversalStatus::Approved, reviewed_by, &notes)
            .await?;

        tx.commit().await?;
        metrics::counter!("reversals_total", "action" => "release").increment(1);

        info!(reversal_id = %request.id, "reversal hold released");
        Ok(request)
    }

    /// APPROVED -> COMPLETED: moves the held funds between the original
    /// parties, writes the reversal entries (one per side, shared
    /// reference), and marks the original entry REVERSED. Only valid from
    /// APPROVED; anything else is an `InvalidStateTransition`.
    pub async fn complete(&self, reversal_id: Uuid) -> Result<ReversalRequest> {
        let request = self.load_request(reversal_id).await?;
        self.require_status(&request, ReversalStatus::Approved, ReversalStatus::Completed)?;

        let original = self.load_original(request.original_transaction_id).await?;
        let held_account_id = request
            .hold_account_id
            .ok_or_else(|| AppError::Validation("Approved request has no hold account".to_string()))?;

        let counterparty_id = match request.reversal_type {
            // Money goes back to the original sender.
            ReversalType::Refund => original.from_account_id,
            // Held sender funds are forwarded to the original receiver.
            ReversalType::SendToReceiver => original.to_account_id,
        }
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Original transaction '{}' has no counterparty for reversal",
                original.id
            ))
        })?;

        let mut tx = self.pool.begin().await?;

        let (mut held, mut counterparty) =
            self.lock_pair(&mut tx, held_account_id, counterparty_id).await?;

        // The held party's available balance was already reduced at
        // approval; only its ledger balance moves now.
        held.debit_held(request.amount)?;
        counterparty.credit(request.amount);

        let held = self
            .accounts
            .persist_balances(&mut tx, held_account_id, held.balance, held.available_balance)
            .await?;
        let counterparty = self
            .accounts
            .persist_balances(
                &mut tx,
                counterparty_id,
                counterparty.balance,
                counterparty.available_balance,
            )
            .await?;

        self.transactions.mark_reversed(&mut tx, original.id).await?;

        let reference = Transaction::generate_reference("RVS");
        let description = Some(format!("reversal of {}", original.reference));

        let debit_type = TransactionType::ReversalDebit;
        let credit_type = match request.reversal_type {
            ReversalType::Refund => TransactionType::ReversalCredit,
            // The receiver sees a normal incoming transfer.
            ReversalType::SendToReceiver => TransactionType::TransferIn,
        };

        let debit_entry = Transaction::new(
            held_account_id,
            debit_type,
            request.amount,
            held.balance,
            reference.clone(),
            description.clone(),
        )
        .with_parties(held_account_id, counterparty_id);
        self.transactions.insert(&mut tx, &debit_entry).await?;

        let credit_entry = Transaction::new(
            counterparty_id,
            credit_type,
            request.amount,
            counterparty.balance,
            reference.clone(),
            description,
        )
        .with_parties(held_account_id, counterparty_id);
        self.transactions.insert(&mut tx, &credit_entry).await?;

        let request = self.reversals.complete(&mut tx, reversal_id).await?;

        tx.commit().await?;
        metrics::counter!("reversals_total", "action" => "complete").increment(1);

        self.notifier
            .notify(NotificationEvent::new(
                request.requested_by,
                NotificationKind::ReversalCompleted,
                request.amount,
                reference,
            ))
            .await;

        Ok(request)
    }

    pub async fn find_by_id(&self, reversal_id: Uuid) -> Result<Option<ReversalRequest>> {
        self.reversals.find_by_id(reversal_id).await
    }

    async fn load_request(&self, reversal_id: Uuid) -> Result<ReversalRequest> {
        self.reversals
            .find_by_id(reversal_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reversal request '{}' not found", reversal_id)))
    }

    async fn load_original(&self, transaction_id: Uuid) -> Result<Transaction> {
        self.transactions
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(transaction_id.to_string()))
    }

    fn require_status(
        &self,
        request: &ReversalRequest,
        expected: ReversalStatus,
        target: ReversalStatus,
    ) -> Result<()> {
        if request.status != expected {
            return Err(AppError::InvalidStateTransition {
                from: format!("{:?}", request.status),
                to: format!("{:?}", target),
            });
        }
        Ok(())
    }

    async fn lock_pair(
        &self,
        tx: &mut PgTx<'_>,
        first_id: Uuid,
        second_id: Uuid,
    ) -> Result<(Account, Account)> {
        // Same ascending-id order as the ledger engine.
        if first_id < second_id {
            let first = self.accounts.lock_for_update(tx, first_id).await?;
            let second = self.accounts.lock_for_update(tx, second_id).await?;
            Ok((first, second))
        } else {
            let second = self.accounts.lock_for_update(tx, second_id).await?;
            let first = self.accounts.lock_for_update(tx, first_id).await?;
            Ok((first, second))
        }
    }
}

/// Which account the approve-hold is taken from.
///
/// REFUND claws money back to the sender, so the hold lands on the original
/// receiver; SEND_TO_RECEIVER guarantees delivery, so the hold lands on the
/// original sender.
fn hold_party(request: &ReversalRequest, original: &Transaction) -> Result<Uuid> {
    let party = match request.reversal_type {
        ReversalType::Refund => original.to_account_id,
        ReversalType::SendToReceiver => original.from_account_id,
    };

    party.ok_or_else(|| {
        AppError::Validation(format!(
            "Original transaction '{}' does not identify both parties",
            original.id
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn original_transfer(from: Uuid, to: Uuid) -> Transaction {
        Transaction::new(
            from,
            TransactionType::TransferOut,
            dec!(50),
            dec!(450),
            "TXN-ORIG".to_string(),
            None,
        )
        .with_parties(from, to)
    }

    #[test]
    fn test_hold_party_refund_holds_receiver() {
        let (from, to) = (Uuid::new_v4(), Uuid::new_v4());
        let original = original_transfer(from, to);
        let request = ReversalRequest::new(
            original.id,
            Uuid::new_v4(),
            dec!(50),
            "dispute".to_string(),
            ReversalType::Refund,
        );
        assert_eq!(hold_party(&request, &original).unwrap(), to);
    }

    #[test]
    fn test_hold_party_send_to_receiver_holds_sender() {
        let (from, to) = (Uuid::new_v4(), Uuid::new_v4());
        let original = original_transfer(from, to);
        let request = ReversalRequest::new(
            original.id,
            Uuid::new_v4(),
            dec!(50),
            "stuck transfer".to_string(),
            ReversalType::SendToReceiver,
        );
        assert_eq!(hold_party(&request, &original).unwrap(), from);
    }

    #[test]
    fn test_hold_party_requires_both_parties() {
        let original = Transaction::new(
            Uuid::new_v4(),
            TransactionType::CardPayment,
            dec!(20),
            dec!(80),
            "TXN-CARD".to_string(),
            None,
        );
        let request = ReversalRequest::new(
            original.id,
            Uuid::new_v4(),
            dec!(20),
            "dispute".to_string(),
            ReversalType::Refund,
        );
        assert!(hold_party(&request, &original).is_err());
    }
}
