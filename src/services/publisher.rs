// src/services/publisher.rs

//! Story event publishing.
//!
//! Events are best effort: one message per call, no buffering beyond the
//! transport's own write buffer and no retries.

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::StoryEvent;

/// Sink for story events.
///
/// Implementations must be safe to call from many workers at once.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Serialize `event` and hand it to the transport.
    async fn publish(&self, subject: &str, event: &StoryEvent) -> Result<()>;

    /// Flush anything still buffered before shutdown.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Encode an event as its JSON wire payload.
pub fn encode_event(event: &StoryEvent) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(event)?)
}

/// NATS core publisher.
///
/// `async_nats::Client` is a cheap handle over one multiplexed connection,
/// so a single publisher is shared by all workers.
#[derive(Clone)]
pub struct NatsPublisher {
    client: async_nats::Client,
}

impl NatsPublisher {
    /// Connect to the broker at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        log::info!("Connecting to NATS at {url}");
        let client = async_nats::connect(url).await.map_err(|e| {
            log::error!("Failed to connect to NATS at {url}: {e}");
            AppError::broker(e)
        })?;
        log::info!("Connected to NATS");
        Ok(Self { client })
    }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, subject: &str, event: &StoryEvent) -> Result<()> {
        let payload = encode_event(event)?;
        log::debug!(
            "Publishing story {} to {} ({} bytes)",
            event.id,
            subject,
            payload.len()
        );

        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| AppError::publish(subject, e))
    }

    async fn close(&self) -> Result<()> {
        log::info!("Flushing NATS connection");
        self.client.flush().await.map_err(AppError::broker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoryId;

    #[test]
    fn test_encode_event() {
        let event = StoryEvent {
            id: StoryId(8863),
            title: "My YC app".to_string(),
            url: "http://www.getdropbox.com".to_string(),
        };

        let bytes = encode_event(&event).unwrap();
        let decoded: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded["id"], 8863);
        assert_eq!(decoded["title"], "My YC app");
        assert_eq!(decoded["url"], "http://www.getdropbox.com");
    }

    #[tokio::test]
    async fn test_connect_failure_is_broker_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = NatsPublisher::connect(&format!("nats://{addr}")).await;
        assert!(matches!(result, Err(AppError::Broker(_))));
    }
}
