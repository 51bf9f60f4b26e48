use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::events::{NotificationEvent, NotificationKind};
use crate::gateway::{CallbackPayload, GatewayOutcome, MobileMoneyGateway};
use crate::models::{
    MobileMoneyRequest, SettlementDirection, SettlementStatus, Transaction, TransactionType,
};
use crate::repositories::{AccountRepository, SettlementRepository, TransactionRepository};
use crate::services::notifications::Notifier;

/// What a reconciliation step did with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Terminal status written and the ledger effect applied.
    Applied,
    /// Terminal failure status written; no ledger effect by design.
    NoLedgerEffect,
    /// Someone else already resolved this request; nothing done.
    AlreadyResolved,
    /// Gateway has not decided yet; request stays PENDING.
    StillPending,
}

/// Resolves tracked mobile-money requests to terminal states and applies
/// the internal ledger effect exactly once per request.
///
/// The exactly-once property comes from the guarded status transitions in
/// `SettlementRepository`: the transition out of PENDING and the balance
/// mutation commit in one DB transaction, so a duplicate callback, a
/// callback racing the poller, or a crash between the two can never
/// double-apply.
pub struct ReconciliationProcessor {
    pool: PgPool,
    gateway: Arc<dyn MobileMoneyGateway>,
    accounts: AccountRepository,
    transactions: TransactionRepository,
    settlements: SettlementRepository,
    notifier: Arc<dyn Notifier>,
    /// Bound on a single gateway status query during a batch run.
    query_timeout: Duration,
    /// Fixed delay between gateway calls in the reversal sweep.
    sweep_delay: Duration,
}

impl ReconciliationProcessor {
    pub fn new(
        pool: PgPool,
        gateway: Arc<dyn MobileMoneyGateway>,
        notifier: Arc<dyn Notifier>,
        query_timeout: Duration,
        sweep_delay: Duration,
    ) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            transactions: TransactionRepository::new(pool.clone()),
            settlements: SettlementRepository::new(pool.clone()),
            pool,
            gateway,
            notifier,
            query_timeout,
            sweep_delay,
        }
    }

    /// Handles an inbound gateway callback. Idempotent against replay: a
    /// second delivery of the same outcome finds the request already
    /// resolved and does nothing.
    pub async fn handle_callback(&self, payload: &CallbackPayload) -> Result<ReconcileAction> {
        let callback = &payload.body.stk_callback;

        let request = self
            .settlements
            .find_by_checkout_id(&callback.checkout_request_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No tracked request for checkout id '{}'",
                    callback.checkout_request_id
                ))
            })?;

        self.apply_outcome(&request, callback.outcome()).await
    }

    /// One periodic pass over all PENDING requests. Each status query is
    /// bounded by `query_timeout` so one unresponsive request cannot starve
    /// the batch; unresolved requests simply stay PENDING for the next run.
    pub async fn resolve_pending(&self) -> Result<u32> {
        let pending = self
            .settlements
            .list_by_status(SettlementStatus::Pending)
            .await?;

        let mut applied = 0;
        for request in &pending {
            let outcome = match tokio::time::timeout(
                self.query_timeout,
                self.gateway.query_status(&request.checkout_request_id),
            )
            .await
            {
                Err(_) => {
                    warn!(request_id = %request.id, "status query timed out; will retry next cycle");
                    continue;
                }
                Ok(Err(e)) => {
                    warn!(request_id = %request.id, error = %e, "status query failed; will retry next cycle");
                    continue;
                }
                Ok(Ok(outcome)) => outcome,
            };

            match self.apply_outcome(request, outcome).await {
                Ok(ReconcileAction::Applied) => applied += 1,
                Ok(_) => {}
                Err(e) => warn!(request_id = %request.id, error = %e, "failed to apply outcome"),
            }
        }

        metrics::counter!("reconciliation_cycles_total").increment(1);
        info!(pending = pending.len(), applied, "reconciliation pass finished");
        Ok(applied)
    }

    /// On-demand sweep over COMPLETED requests looking for gateway-side
    /// reversals the periodic check missed. Rate-limits gateway calls with
    /// a fixed delay between checks.
    pub async fn sweep_reversals(&self) -> Result<u32> {
        let completed = self
            .settlements
            .list_by_status(SettlementStatus::Completed)
            .await?;

        let mut reversed = 0;
        for request in &completed {
            let Some(receipt) = request.receipt_number.as_deref() else {
                continue;
            };

            tokio::time::sleep(self.sweep_delay).await;

            match self.gateway.query_reversal(receipt).await {
                Ok(true) => match self.apply_gateway_reversal(request).await {
                    Ok(ReconcileAction::Applied) => reversed += 1,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(request_id = %request.id, error = %e, "failed to apply gateway reversal")
                    }
                },
                Ok(false) => {}
                Err(e) => warn!(request_id = %request.id, error = %e, "reversal query failed"),
            }
        }

        info!(checked = completed.len(), reversed, "reversal sweep finished");
        Ok(reversed)
    }

    /// Applies a gateway outcome to a tracked request.
    pub async fn apply_outcome(
        &self,
        request: &MobileMoneyRequest,
        outcome: GatewayOutcome,
    ) -> Result<ReconcileAction> {
        match outcome {
            GatewayOutcome::StillPending => Ok(ReconcileAction::StillPending),
            GatewayOutcome::Completed { receipt_number } => {
                self.apply_completion(request, receipt_number).await
            }
            GatewayOutcome::Cancelled => {
                self.apply_failure(request, SettlementStatus::Cancelled, 1032, "cancelled by user")
                    .await
            }
            GatewayOutcome::Timeout => {
                self.apply_failure(request, SettlementStatus::Timeout, 1037, "request timed out")
                    .await
            }
            GatewayOutcome::Failed { code, description } => {
                self.apply_failure(request, SettlementStatus::Failed, code, &description)
                    .await
            }
        }
    }

    /// PENDING -> COMPLETED plus the single ledger effect, atomically.
    async fn apply_completion(
        &self,
        request: &MobileMoneyRequest,
        receipt_number: Option<String>,
    ) -> Result<ReconcileAction> {
        let receipt = receipt_number.unwrap_or_default();

        let mut tx = self.pool.begin().await?;

        // The guard: zero rows means another actor got here first.
        let Some(updated) = self
            .settlements
            .mark_completed(&mut tx, request.id, &receipt, 0, "processed successfully")
            .await?
        else {
            return Ok(ReconcileAction::AlreadyResolved);
        };

        let mut account = self
            .accounts
            .lock_for_update(&mut tx, updated.account_id)
            .await?;

        let (entry_type, kind) = match updated.direction {
            SettlementDirection::Deposit => {
                account.credit(updated.amount);
                (TransactionType::Deposit, NotificationKind::MobileMoneyDeposited)
            }
            SettlementDirection::Withdrawal => {
                // The payout already left the gateway; an insufficient
                // balance here rolls the whole transaction back and leaves
                // the request PENDING for operator attention.
                account.debit(updated.amount)?;
                (TransactionType::Withdrawal, NotificationKind::MobileMoneyWithdrawn)
            }
        };

        let account = self
            .accounts
            .persist_balances(&mut tx, updated.account_id, account.balance, account.available_balance)
            .await?;

        let entry = Transaction::new(
            updated.account_id,
            entry_type,
            updated.amount,
            account.balance,
            Transaction::generate_reference("MMO"),
            Some(format!("mobile money {} ({})", direction_label(updated.direction), receipt)),
        );
        let entry = self.transactions.insert(&mut tx, &entry).await?;

        tx.commit().await?;
        metrics::counter!("settlements_applied_total").increment(1);

        self.notifier
            .notify(NotificationEvent::new(
                account.customer_id,
                kind,
                updated.amount,
                entry.reference,
            ))
            .await;

        info!(request_id = %updated.id, %receipt, "settlement completed and applied");
        Ok(ReconcileAction::Applied)
    }

    /// PENDING -> CANCELLED / TIMEOUT / FAILED. Never touches the ledger.
    async fn apply_failure(
        &self,
        request: &MobileMoneyRequest,
        status: SettlementStatus,
        code: i32,
        description: &str,
    ) -> Result<ReconcileAction> {
        let updated = self
            .settlements
            .mark_failed(request.id, status, code, description)
            .await?;

        match updated {
            Some(row) => {
                info!(request_id = %row.id, ?status, "settlement resolved without ledger effect");
                Ok(ReconcileAction::NoLedgerEffect)
            }
            None => Ok(ReconcileAction::AlreadyResolved),
        }
    }

    /// COMPLETED -> REVERSED with a compensating entry opposite in
    /// direction to the original effect.
    async fn apply_gateway_reversal(
        &self,
        request: &MobileMoneyRequest,
    ) -> Result<ReconcileAction> {
        let mut tx = self.pool.begin().await?;

        let Some(updated) = self
            .settlements
            .mark_reversed(&mut tx, request.id, "reversed by gateway")
            .await?
        else {
            return Ok(ReconcileAction::AlreadyResolved);
        };

        let mut account = self
            .accounts
            .lock_for_update(&mut tx, updated.account_id)
            .await?;

        // Compensation runs opposite to the original effect: a confirmed
        // deposit (credit) is clawed back with a debit, a confirmed payout
        // (debit) is restored with a credit.
        let entry_type = match updated.direction {
            SettlementDirection::Deposit => {
                account.debit(updated.amount)?;
                TransactionType::ReversalDebit
            }
            SettlementDirection::Withdrawal => {
                account.credit(updated.amount);
                TransactionType::ReversalCredit
            }
        };

        let account = self
            .accounts
            .persist_balances(&mut tx, updated.account_id, account.balance, account.available_balance)
            .await?;

        let entry = Transaction::new(
            updated.account_id,
            entry_type,
            updated.amount,
            account.balance,
            Transaction::generate_reference("MMR"),
            Some(format!(
                "gateway reversal of {}",
                updated.receipt_number.as_deref().unwrap_or("unknown receipt")
            )),
        );
        let entry = self.transactions.insert(&mut tx, &entry).await?;

        tx.commit().await?;
        metrics::counter!("settlements_reversed_total").increment(1);

        self.notifier
            .notify(NotificationEvent::new(
                account.customer_id,
                NotificationKind::MobileMoneyReversed,
                updated.amount,
                entry.reference,
            ))
            .await;

        info!(request_id = %updated.id, "gateway reversal compensated");
        Ok(ReconcileAction::Applied)
    }

    /// Sandbox-only: force-completes every PENDING request with a synthetic
    /// receipt. Compiled out of production builds entirely; the runtime
    /// config flag must also be set for the scheduler to call this.
    #[cfg(feature = "simulate-gateway")]
    pub async fn simulate_complete_pending(&self) -> Result<u32> {
        let pending = self
            .settlements
            .list_by_status(SettlementStatus::Pending)
            .await?;

        let mut applied = 0;
        for request in &pending {
            let receipt = format!("SIM{}", &request.checkout_request_id);
            let action = self
                .apply_completion(request, Some(receipt))
                .await?;
            if action == ReconcileAction::Applied {
                applied += 1;
            }
        }

        warn!(applied, "simulated completion of pending settlements (sandbox mode)");
        Ok(applied)
    }
}

fn direction_label(direction: SettlementDirection) -> &'static str {
    match direction {
        SettlementDirection::Deposit => "deposit",
        SettlementDirection::Withdrawal => "withdrawal",
    }
}
