use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// What the reversal should do with the disputed money. Decided when the
/// request is created and carried on the row, never inferred from the shape
/// of an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reversal_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReversalType {
    /// Claw the money back from the receiver to the original sender.
    Refund,
    /// Guarantee delivery: hold the sender's funds and forward them to the
    /// receiver.
    SendToReceiver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reversal_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReversalStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl ReversalStatus {
    pub fn valid_transitions(&self) -> &'static [ReversalStatus] {
        match self {
            ReversalStatus::Pending => &[ReversalStatus::Approved, ReversalStatus::Rejected],
            // Rejected-from-Approved is the explicit hold-release path.
            ReversalStatus::Approved => &[ReversalStatus::Completed, ReversalStatus::Rejected],
            ReversalStatus::Rejected => &[],
            ReversalStatus::Completed => &[],
        }
    }

    pub fn can_transition_to(&self, next: ReversalStatus) -> bool {
        self.valid_transitions().contains(&next)
    }
}

/// A customer dispute/correction against a previously completed transaction.
///
/// Lifecycle: PENDING -> APPROVED (funds held) -> COMPLETED (funds moved),
/// or PENDING/APPROVED -> REJECTED (any hold released).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReversalRequest {
    pub id: Uuid,
    pub original_transaction_id: Uuid,
    pub requested_by: Uuid,
    pub amount: Decimal,
    pub reason: String,
    pub reversal_type: ReversalType,
    pub status: ReversalStatus,
    pub reviewed_by: Option<Uuid>,
    pub review_notes: Option<String>,
    /// The account the approve-hold was taken from. Set at approval so the
    /// completion (or release) path never has to re-derive it.
    pub hold_account_id: Option<Uuid>,
    pub hold_placed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ReversalRequest {
    pub fn new(
        original_transaction_id: Uuid,
        requested_by: Uuid,
        amount: Decimal,
        reason: String,
        reversal_type: ReversalType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            original_transaction_id,
            requested_by,
            amount,
            reason,
            reversal_type,
            status: ReversalStatus::Pending,
            reviewed_by: None,
            review_notes: None,
            hold_account_id: None,
            hold_placed_at: None,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    /// Validates and applies a status transition.
    pub fn transition(&mut self, next: ReversalStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::InvalidStateTransition {
                from: format!("{:?}", self.status),
                to: format!("{:?}", next),
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn has_outstanding_hold(&self) -> bool {
        self.status == ReversalStatus::Approved && self.hold_account_id.is_some()
    }
}
