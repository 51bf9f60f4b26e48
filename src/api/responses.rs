use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Account, AccountStatus, MobileMoneyRequest, ReversalRequest, ReversalStatus, ReversalType,
    SettlementDirection, SettlementStatus, Transaction, TransactionStatus, TransactionType,
};
use crate::services::Receipt;

/// Standard API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: ErrorResponse) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub database: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub account_number: String,
    pub currency: String,
    pub balance: Decimal,
    pub available_balance: Decimal,
    pub status: AccountStatus,
    pub last_transaction_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            customer_id: account.customer_id,
            account_number: account.account_number,
            currency: account.currency,
            balance: account.balance,
            available_balance: account.available_balance,
            status: account.status,
            last_transaction_at: account.last_transaction_at,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub account_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub reference: String,
    pub status: TransactionStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(entry: Transaction) -> Self {
        Self {
            id: entry.id,
            account_id: entry.account_id,
            transaction_type: entry.transaction_type,
            amount: entry.amount,
            balance_after: entry.balance_after,
            reference: entry.reference,
            status: entry.status,
            description: entry.description,
            created_at: entry.created_at,
        }
    }
}

/// Returned by every ledger-affecting operation: the support reference, the
/// resulting balance and the fee charged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptResponse {
    pub reference: String,
    pub new_balance: Decimal,
    pub fee_charged: Decimal,
    pub message: String,
}

impl From<Receipt> for ReceiptResponse {
    fn from(receipt: Receipt) -> Self {
        Self {
            reference: receipt.reference,
            new_balance: receipt.new_balance,
            fee_charged: receipt.fee_charged,
            message: receipt.message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReversalResponse {
    pub id: Uuid,
    pub original_transaction_id: Uuid,
    pub amount: Decimal,
    pub reversal_type: ReversalType,
    pub status: ReversalStatus,
    pub reason: String,
    pub review_notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ReversalRequest> for ReversalResponse {
    fn from(request: ReversalRequest) -> Self {
        Self {
            id: request.id,
            original_transaction_id: request.original_transaction_id,
            amount: request.amount,
            reversal_type: request.reversal_type,
            status: request.status,
            reason: request.reason,
            review_notes: request.review_notes,
            completed_at: request.completed_at,
            created_at: request.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementResponse {
    pub id: Uuid,
    pub checkout_request_id: String,
    pub account_id: Uuid,
    pub direction: SettlementDirection,
    pub amount: Decimal,
    pub status: SettlementStatus,
    pub receipt_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MobileMoneyRequest> for SettlementResponse {
    fn from(request: MobileMoneyRequest) -> Self {
        Self {
            id: request.id,
            checkout_request_id: request.checkout_request_id,
            account_id: request.account_id,
            direction: request.direction,
            amount: request.amount,
            status: request.status,
            receipt_number: request.receipt_number,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}
