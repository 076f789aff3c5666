//! In-process revocation store for tests and single-node setups.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use common::{AppError, AppResult, Clock, SystemClock};

use super::{revocation_key, RevocationStore};

/// Revocation store held in a mutex-guarded map, expiring against a [`Clock`].
#[derive(Clone)]
pub struct InMemoryRevocationStore {
    entries: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRevocationStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Number of unexpired records.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .lock()
            .map(|entries| entries.values().filter(|expiry| **expiry > now).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryRevocationStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn add(&self, token_id: &str, ttl: Duration) -> AppResult<()> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AppError::internal(format!("Revocation TTL out of range: {}", e)))?;
        let expiry = self.clock.now() + ttl;

        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::internal("Revocation store lock poisoned"))?;
        entries.insert(revocation_key(token_id), expiry);
        Ok(())
    }

    async fn exists(&self, token_id: &str) -> AppResult<bool> {
        let now = self.clock.now();
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::internal("Revocation store lock poisoned"))?;

        entries.retain(|_, expiry| *expiry > now);
        Ok(entries.contains_key(&revocation_key(token_id)))
    }
}
