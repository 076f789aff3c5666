//! Auth Service Library
//!
//! Token lifecycle for the auth service: account registration and login,
//! access/refresh token issuance, validation, rotation and revocation.
//! Accounts live in PostgreSQL; revocations and domain events go to Redis.

pub mod config;
pub mod events;
pub mod infra;
pub mod repository;
pub mod revocation;
pub mod service;
pub mod token;

use std::sync::Arc;

use redis::aio::ConnectionManager;
use tracing::info;

use crate::config::AuthServiceConfig;
use crate::events::RedisEventBus;
use crate::infra::Database;
use crate::repository::AccountStore;
use crate::revocation::RedisRevocationStore;
use crate::service::{LifecycleSettings, TokenLifecycleService};
use crate::token::TokenManager;
use common::{Clock, SystemClock};

/// Connect to PostgreSQL and Redis and assemble the lifecycle service.
///
/// The revocation store and the event bus share one Redis connection manager.
pub async fn connect(config: &AuthServiceConfig) -> Result<TokenLifecycleService, Box<dyn std::error::Error>> {
    let db = Database::connect(&config.database).await?;

    let client = redis::Client::open(config.cache.url.as_str())?;
    let redis = ConnectionManager::new(client).await?;
    info!("Connected to database and Redis");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    Ok(TokenLifecycleService::new(
        Arc::new(AccountStore::new(db.get_connection())),
        Arc::new(RedisRevocationStore::new(redis.clone())),
        Arc::new(RedisEventBus::new(redis, config.events.stream_key.clone())),
        TokenManager::new(&config.jwt, clock.clone())?,
        clock,
        LifecycleSettings::from(config),
    ))
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(
    config: &AuthServiceConfig,
    action: MigrateAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::connect(&config.database).await?;
    db.ping().await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}
