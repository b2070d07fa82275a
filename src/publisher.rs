//! Best-effort domain event publishing over NATS.

use crate::domain::events::DomainEvent;

/// Publishes [`DomainEvent`]s when a NATS connection is configured.
///
/// Publishing never fails the caller: errors are logged and dropped.
#[derive(Clone, Debug, Default)]
pub struct EventPublisher {
    client: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn disabled() -> Self { Self::default() }

    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::disabled() };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(%url, "connected to NATS");
                Self { client: Some(client) }
            }
            Err(err) => {
                tracing::warn!(%url, error = %err, "NATS unavailable, events disabled");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool { self.client.is_some() }

    pub async fn publish(&self, event: &DomainEvent) {
        let Some(client) = &self.client else { return };
        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(subject = event.subject(), error = %err, "failed to encode event");
                return;
            }
        };
        if let Err(err) = client.publish(event.subject().to_string(), payload.into()).await {
            tracing::warn!(subject = event.subject(), error = %err, "failed to publish event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_disabled_publisher_is_a_no_op() {
        let publisher = EventPublisher::connect(None).await;
        assert!(!publisher.is_enabled());
        publisher.publish(&DomainEvent::UserRegistered { user_id: Uuid::nil(), email: "ada@example.com".into() }).await;
    }
}
