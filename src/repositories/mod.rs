mod account_repository;
mod card_repository;
mod fee_repository;
mod reversal_repository;
mod settlement_repository;
mod transaction_repository;

pub use account_repository::AccountRepository;
pub use card_repository::CardRepository;
pub use fee_repository::FeeRepository;
pub use reversal_repository::ReversalRepository;
pub use settlement_repository::SettlementRepository;
pub use transaction_repository::TransactionRepository;

/// Alias for an open Postgres transaction passed down into repositories.
pub type PgTx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;
