pub mod ledger;
pub mod notifications;
pub mod payments;
pub mod reversals;

pub use ledger::{LedgerService, Posting, TransferPosting};
pub use notifications::{KafkaNotifier, LogNotifier, Notifier};
pub use payments::{PaymentEngine, Receipt};
pub use reversals::ReversalService;
