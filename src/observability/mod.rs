pub mod logging;
pub mod metrics;

pub use logging::{init_logging, mask_account_number, mask_phone, LogConfig, LogFormat};
pub use metrics::init_metrics;
