use rust_decimal::Decimal;
use thiserror::Error;

/// Application-wide error taxonomy.
///
/// Validation-class errors abort before any ledger write; once a write has
/// committed, side-effect failures (notifications, metrics) are logged and
/// never undo the financial mutation.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Insufficient available balance: requested {requested}, available {available}")]
    InsufficientAvailableBalance {
        requested: Decimal,
        available: Decimal,
    },

    /// Workflow reached an impossible state. Programming error, surfaced as-is.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Card not found: {0}")]
    CardNotFound(String),

    #[error("Card is not active: {0}")]
    CardInactive(String),

    #[error("Card is expired: {0}")]
    CardExpired(String),

    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Invalid external account identifier: {0}")]
    InvalidExternalAccount(String),

    /// Transient transport failure talking to the mobile-money gateway.
    /// The affected request stays PENDING and is retried by the scheduler.
    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Gateway error {code}: {message}")]
    GatewayError { code: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True for errors the caller can recover from by changing the request
    /// (top up, smaller amount, retry later).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::InsufficientFunds { .. }
                | AppError::InsufficientAvailableBalance { .. }
                | AppError::GatewayUnavailable(_)
        )
    }

    /// Short machine-readable code used in API error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            AppError::InsufficientAvailableBalance { .. } => "INSUFFICIENT_AVAILABLE_BALANCE",
            AppError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            AppError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            AppError::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            AppError::CardNotFound(_) => "CARD_NOT_FOUND",
            AppError::CardInactive(_) => "CARD_INACTIVE",
            AppError::CardExpired(_) => "CARD_EXPIRED",
            AppError::InvalidCredential => "INVALID_CREDENTIAL",
            AppError::InvalidExternalAccount(_) => "INVALID_EXTERNAL_ACCOUNT",
            AppError::GatewayUnavailable(_) => "GATEWAY_UNAVAILABLE",
            AppError::GatewayError { .. } => "GATEWAY_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
