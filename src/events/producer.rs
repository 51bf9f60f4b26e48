use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use chrono::Utc;
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::client::ClientBuilder;
use rskafka::record::Record;
use std::collections::BTreeMap;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::events::{EventEnvelope, NotificationEvent};

/// Kafka connection settings for the notification topic.
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    pub brokers: Vec<String>,
    pub topic: String,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            topic: "banking.notifications".to_string(),
            retry_count: 3,
            retry_delay_ms: 100,
        }
    }
}

/// Publishes notification events to Kafka.
///
/// The partition client is created lazily on first publish so startup does
/// not depend on the broker being reachable; failures there surface as
/// publish errors, which callers treat as fire-and-forget.
pub struct NotificationProducer {
    config: ProducerConfig,
    partition: OnceCell<Arc<PartitionClient>>,
}

impl NotificationProducer {
    pub fn new(config: ProducerConfig) -> Self {
        Self {
            config,
            partition: OnceCell::new(),
        }
    }

    async fn partition_client(&self) -> Result<Arc<PartitionClient>> {
        let client = self
            .partition
            .get_or_try_init(|| async {
                let client = ClientBuilder::new(self.config.brokers.clone())
                    .build()
                    .await
                    .map_err(|e| AppError::Internal(anyhow!("Kafka connect failed: {e}")))?;

                let partition = client
                    .partition_client(self.config.topic.clone(), 0, UnknownTopicHandling::Retry)
                    .await
                    .map_err(|e| AppError::Internal(anyhow!("Kafka partition client failed: {e}")))?;

                Ok::<_, AppError>(Arc::new(partition))
            })
            .await?;

        Ok(client.clone())
    }

    /// Publishes one notification event, keyed by customer id.
    pub async fn publish(&self, event: NotificationEvent) -> Result<i64> {
        let key = event.customer_id.to_string();
        let envelope = EventEnvelope::new(event);
        let payload = serde_json::to_vec(&envelope)
            .map_err(|e| AppError::Internal(anyhow!("event serialization failed: {e}")))?;

        let record = Record {
            key: Some(key.into_bytes()),
            value: Some(payload),
            headers: BTreeMap::new(),
            timestamp: Utc::now(),
        };

        let partition = self.partition_client().await?;

        let mut last_error = None;
        for attempt in 0..=self.config.retry_count {
            if attempt > 0 {
                warn!(attempt, "retrying notification publish");
                tokio::time::sleep(Duration::from_millis(
                    self.config.retry_delay_ms * attempt as u64,
                ))
                .await;
            }

            match partition
                .produce(vec![record.clone()], Compression::NoCompression)
                .await
            {
                Ok(offsets) => {
                    let offset = offsets.first().copied().unwrap_or(0);
                    debug!(topic = %self.config.topic, offset, "notification published");
                    return Ok(offset);
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(AppError::Internal(anyhow!(
            "notification publish failed after {} retries: {:?}",
            self.config.retry_count,
            last_error
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProducerConfig::default();
        assert_eq!(config.topic, "banking.notifications");
        assert_eq!(config.retry_count, 3);
    }
}
