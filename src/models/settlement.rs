use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Which way money moves through the mobile-money gateway, from the bank's
/// point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "settlement_direction", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementDirection {
    /// Customer pushes money in; on completion the internal account is credited.
    Deposit,
    /// Bank pays the customer out; on completion the internal account is debited.
    Withdrawal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "settlement_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    Pending,
    Completed,
    Cancelled,
    Timeout,
    Failed,
    Reversed,
}

impl SettlementStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SettlementStatus::Pending)
    }

    /// The ledger effect fires only on PENDING -> COMPLETED; a COMPLETED
    /// request may later become REVERSED (compensating entry).
    pub fn can_transition_to(&self, next: SettlementStatus) -> bool {
        match self {
            SettlementStatus::Pending => matches!(
                next,
                SettlementStatus::Completed
                    | SettlementStatus::Cancelled
                    | SettlementStatus::Timeout
                    | SettlementStatus::Failed
            ),
            SettlementStatus::Completed => matches!(next, SettlementStatus::Reversed),
            _ => false,
        }
    }
}

/// A tracked asynchronous push-payment request against the mobile-money
/// gateway. The internal ledger effect is applied at most once, keyed off
/// the PENDING -> COMPLETED transition.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MobileMoneyRequest {
    pub id: Uuid,
    pub merchant_request_id: String,
    /// Gateway correlation id; unique, used to match callbacks and queries.
    pub checkout_request_id: String,
    pub phone_number: String,
    pub account_id: Uuid,
    pub direction: SettlementDirection,
    pub amount: Decimal,
    pub status: SettlementStatus,
    /// Gateway receipt, set once the request confirms.
    pub receipt_number: Option<String>,
    pub result_code: Option<i32>,
    pub result_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MobileMoneyRequest {
    pub fn new(
        merchant_request_id: String,
        checkout_request_id: String,
        phone_number: String,
        account_id: Uuid,
        direction: SettlementDirection,
        amount: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            merchant_request_id,
            checkout_request_id,
            phone_number,
            account_id,
            direction,
            amount,
            status: SettlementStatus::Pending,
            receipt_number: None,
            result_code: None,
            result_description: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pending_request() -> MobileMoneyRequest {
        MobileMoneyRequest::new(
            "29115-34620561-1".to_string(),
            "ws_CO_191220191020363925".to_string(),
            "254712345678".to_string(),
            Uuid::new_v4(),
            SettlementDirection::Deposit,
            dec!(100),
        )
    }

    #[test]
    fn test_new_request_is_pending() {
        let req = pending_request();
        assert_eq!(req.status, SettlementStatus::Pending);
        assert!(req.receipt_number.is_none());
    }

    #[test]
    fn test_pending_reaches_all_terminal_failures() {
        for next in [
            SettlementStatus::Completed,
            SettlementStatus::Cancelled,
            SettlementStatus::Timeout,
            SettlementStatus::Failed,
        ] {
            assert!(SettlementStatus::Pending.can_transition_to(next));
        }
        assert!(!SettlementStatus::Pending.can_transition_to(SettlementStatus::Reversed));
    }

    #[test]
    fn test_only_completed_can_reverse() {
        assert!(SettlementStatus::Completed.can_transition_to(SettlementStatus::Reversed));
        assert!(!SettlementStatus::Failed.can_transition_to(SettlementStatus::Reversed));
        assert!(!SettlementStatus::Cancelled.can_transition_to(SettlementStatus::Completed));
    }

    #[test]
    fn test_completed_is_not_re_completable() {
        // Duplicate success callbacks must not re-trigger the ledger effect.
        assert!(!SettlementStatus::Completed.can_transition_to(SettlementStatus::Completed));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!SettlementStatus::Pending.is_terminal());
        for status in [
            SettlementStatus::Completed,
            SettlementStatus::Cancelled,
            SettlementStatus::Timeout,
            SettlementStatus::Failed,
            SettlementStatus::Reversed,
        ] {
            assert!(status.is_terminal());
        }
    }
}
