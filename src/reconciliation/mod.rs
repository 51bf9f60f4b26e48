mod processor;
mod scheduler;

pub use processor::{ReconcileAction, ReconciliationProcessor};
pub use scheduler::ReconciliationScheduler;
