//! Redis-backed revocation store.

use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};

use common::AppResult;
use domain::REVOCATION_MARKER;

use super::{revocation_key, RevocationStore};

/// Revocation store using `SET key "revoked" EX ttl`.
///
/// Redis expires the key on its own, so no cleanup is ever issued.
#[derive(Clone)]
pub struct RedisRevocationStore {
    connection: ConnectionManager,
}

impl RedisRevocationStore {
    /// Connect to Redis.
    pub async fn connect(url: &str) -> AppResult<Self> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        tracing::info!("Revocation store connected");
        Ok(Self { connection })
    }

    /// Wrap an existing connection.
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn add(&self, token_id: &str, ttl: Duration) -> AppResult<()> {
        let mut conn = self.connection.clone();
        // EX takes whole seconds and rejects 0.
        let seconds = (ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0)).max(1);

        conn.set_ex::<_, _, ()>(revocation_key(token_id), REVOCATION_MARKER, seconds)
            .await?;

        tracing::debug!(token_id = %token_id, ttl_seconds = seconds, "Token revoked");
        Ok(())
    }

    async fn exists(&self, token_id: &str) -> AppResult<bool> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(revocation_key(token_id)).await?;
        Ok(exists)
    }
}
