//! Domain event publication.
//!
//! Publication is at-most-once: a single attempt per event, no retry, no
//! outbox. An event can be lost if the process dies between the store commit
//! and the publish, or if the bus is down at that moment. Callers log the
//! failure and carry on.

mod memory;
mod redis_stream;

use async_trait::async_trait;

use common::AppResult;
use domain::DomainEvent;

pub use memory::InMemoryEventBus;
pub use redis_stream::RedisEventBus;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Durable bus receiving domain events.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Make one attempt to publish `event`.
    async fn publish(&self, event: &DomainEvent) -> AppResult<()>;
}
