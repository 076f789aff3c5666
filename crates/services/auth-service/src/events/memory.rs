//! In-process event bus that records what it was given.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;

use common::{AppError, AppResult};
use domain::{DomainEvent, EventKind};

use super::EventBus;

/// Collects published events in order. Can be switched offline to simulate an
/// unreachable bus.
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    published: Arc<Mutex<Vec<DomainEvent>>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent publishes fail (`true`) or succeed (`false`).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Snapshot of everything published so far.
    pub fn published(&self) -> Vec<DomainEvent> {
        self.published
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of published events of `kind`.
    pub fn count(&self, kind: EventKind) -> usize {
        self.published().iter().filter(|e| e.kind == kind).count()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, event: &DomainEvent) -> AppResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::store_unavailable("event bus offline"));
        }

        self.published
            .lock()
            .map_err(|_| AppError::internal("Event bus lock poisoned"))?
            .push(event.clone());
        Ok(())
    }
}
