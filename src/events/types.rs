use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened, from the customer's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    DepositReceived,
    WithdrawalCompleted,
    TransferSent,
    TransferReceived,
    CardPaymentCompleted,
    BillPaymentCompleted,
    LoanDisbursed,
    LoanPaymentReceived,
    ReversalRequested,
    ReversalApproved,
    ReversalRejected,
    ReversalCompleted,
    MobileMoneyDeposited,
    MobileMoneyWithdrawn,
    MobileMoneyReversed,
}

/// Envelope wrapping every outbound event with common metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub payload: T,
}

impl<T> EventEnvelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: "banking-core".to_string(),
            payload,
        }
    }
}

/// Payload handed to the notification collaborator. Delivery (SMS, email)
/// is someone else's job; the core only states what happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub customer_id: Uuid,
    pub kind: NotificationKind,
    pub amount: Decimal,
    /// Support reference of the ledger entry or workflow row this is about.
    pub reference: String,
}

impl NotificationEvent {
    pub fn new(
        customer_id: Uuid,
        kind: NotificationKind,
        amount: Decimal,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            customer_id,
            kind,
            amount,
            reference: reference.into(),
        }
    }
}
