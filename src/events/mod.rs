mod producer;
mod types;

pub use producer::{NotificationProducer, ProducerConfig};
pub use types::{EventEnvelope, NotificationEvent, NotificationKind};
