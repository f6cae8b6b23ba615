use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::constants::system::DEFAULT_EVENT_CHANNEL_CAPACITY;

/// Fan-out of request lifecycle events to notification and audit consumers.
///
/// Delivery is best effort: publishing with no subscribers succeeds, and a
/// slow subscriber lags rather than blocking the lifecycle.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub name: String,
    /// Request the event concerns, lifted out of the context when present
    pub service_request_id: Option<i64>,
    pub context: Value,
    pub published_at: DateTime<Utc>,
}

impl PublishedEvent {
    pub fn concerns(&self, service_request_id: i64) -> bool {
        self.service_request_id == Some(service_request_id)
    }
}

impl EventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish `context` under `event_name`
    pub async fn publish(
        &self,
        event_name: impl Into<String>,
        context: Value,
    ) -> Result<(), PublishError> {
        let event = PublishedEvent {
            name: event_name.into(),
            service_request_id: context.get("service_request_id").and_then(Value::as_i64),
            context,
            published_at: Utc::now(),
        };

        match self.sender.send(event) {
            Ok(receivers) => tracing::trace!(receivers = receivers, "Lifecycle event published"),
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(event = %event.name, "Lifecycle event dropped, no subscribers")
            }
        }
        Ok(())
    }

    /// Serialize `payload` and publish it as the event context
    pub async fn publish_payload<T: Serialize + ?Sized>(
        &self,
        event_name: impl Into<String>,
        payload: &T,
    ) -> Result<(), PublishError> {
        let context = serde_json::to_value(payload)?;
        self.publish(event_name, context).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Event payload could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}
