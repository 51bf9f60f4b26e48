use async_trait::async_trait;
use tracing::{info, warn};

use crate::events::{NotificationEvent, NotificationProducer};

/// Notification collaborator seam. Fire-and-forget from the core's point of
/// view: a failed notification is logged and never rolls back the ledger
/// mutation it describes.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: NotificationEvent);
}

/// Publishes notifications to Kafka, swallowing (but logging) failures.
pub struct KafkaNotifier {
    producer: NotificationProducer,
}

impl KafkaNotifier {
    pub fn new(producer: NotificationProducer) -> Self {
        Self { producer }
    }
}

#[async_trait]
impl Notifier for KafkaNotifier {
    async fn notify(&self, event: NotificationEvent) {
        let reference = event.reference.clone();
        if let Err(e) = self.producer.publish(event).await {
            warn!(%reference, error = %e, "notification publish failed; ledger state unaffected");
        }
    }
}

/// Fallback notifier used when Kafka is disabled: just logs the event.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: NotificationEvent) {
        info!(
            customer_id = %event.customer_id,
            kind = ?event.kind,
            amount = %event.amount,
            reference = %event.reference,
            "notification"
        );
    }
}
