//! Redis Streams event bus.

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use common::{AppError, AppResult};
use domain::DomainEvent;

use super::EventBus;

/// Appends each event to a Redis stream with `XADD <key> * ...`.
#[derive(Clone)]
pub struct RedisEventBus {
    connection: ConnectionManager,
    stream_key: String,
}

impl RedisEventBus {
    pub fn new(connection: ConnectionManager, stream_key: impl Into<String>) -> Self {
        Self {
            connection,
            stream_key: stream_key.into(),
        }
    }
}

#[async_trait]
impl EventBus for RedisEventBus {
    async fn publish(&self, event: &DomainEvent) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let payload = serde_json::to_string(&event.payload)
            .map_err(|e| AppError::internal(format!("Event serialization error: {}", e)))?;

        let entry_id: String = redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("*")
            .arg("event_id")
            .arg(event.id.to_string())
            .arg("name")
            .arg(event.name())
            .arg("aggregate_id")
            .arg(event.aggregate_id.to_string())
            .arg("occurred_at")
            .arg(event.occurred_at.to_rfc3339())
            .arg("payload")
            .arg(payload)
            .query_async(&mut conn)
            .await?;

        tracing::debug!(
            stream = %self.stream_key,
            entry_id = %entry_id,
            event = %event.name(),
            "Event published"
        );
        Ok(())
    }
}
