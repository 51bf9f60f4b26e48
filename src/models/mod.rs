pub mod account;
pub mod card;
pub mod fee;
pub mod reversal;
pub mod settlement;
pub mod transaction;

pub use account::{Account, AccountStatus};
pub use card::{Card, CardStatus};
pub use fee::{FeeRecord, FeeRule, TransactionCategory};
pub use reversal::{ReversalRequest, ReversalStatus, ReversalType};
pub use settlement::{MobileMoneyRequest, SettlementDirection, SettlementStatus};
pub use transaction::{Transaction, TransactionStatus, TransactionType};
