//! Database connection and migration management.

use std::collections::HashSet;
use std::time::Duration;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseConnection, DbErr,
    EntityTrait, QueryOrder, Statement,
};
use sea_orm_migration::{seaql_migrations, MigratorTrait};

use super::migrations::Migrator;
use common::DatabaseConfig;

/// Database wrapper for connection management
pub struct Database {
    connection: DatabaseConnection,
}

// `DatabaseConnection` stops implementing `Clone` when sea-orm's `mock`
// feature is unified in (the dev-dependency enables it for tests), so clone
// the pool variant explicitly instead of deriving.
fn clone_connection(connection: &DatabaseConnection) -> DatabaseConnection {
    #[allow(unreachable_patterns)]
    match connection {
        DatabaseConnection::SqlxPostgresPoolConnection(pool) => {
            DatabaseConnection::SqlxPostgresPoolConnection(pool.clone())
        }
        DatabaseConnection::Disconnected => DatabaseConnection::Disconnected,
        _ => unreachable!("Database only wraps Postgres pool connections"),
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            connection: clone_connection(&self.connection),
        }
    }
}

impl Database {
    /// Open a connection pool sized by `config`. Migrations are not run.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbErr> {
        let mut options = ConnectOptions::new(config.url.clone());
        options
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(5))
            .sqlx_logging(false);

        let connection = SeaDatabase::connect(options).await?;
        tracing::debug!("Database connected");
        Ok(Self { connection })
    }

    /// Get a clone of the database connection.
    pub fn get_connection(&self) -> DatabaseConnection {
        clone_connection(&self.connection)
    }

    /// Run pending migrations.
    pub async fn run_migrations(&self) -> Result<(), DbErr> {
        Migrator::up(&self.connection, None).await
    }

    /// Rollback the last migration.
    pub async fn rollback_migration(&self) -> Result<(), DbErr> {
        Migrator::down(&self.connection, Some(1)).await
    }

    /// Every known migration with whether it has been applied.
    pub async fn migration_status(&self) -> Result<Vec<(String, bool)>, DbErr> {
        let applied: HashSet<String> = seaql_migrations::Entity::find()
            .order_by_asc(seaql_migrations::Column::Version)
            .all(&self.connection)
            .await?
            .into_iter()
            .map(|m| m.version)
            .collect();

        Ok(Migrator::migrations()
            .iter()
            .map(|m| {
                let name = m.name().to_string();
                let is_applied = applied.contains(&name);
                (name, is_applied)
            })
            .collect())
    }

    /// Drop everything and re-apply all migrations.
    pub async fn fresh_migrations(&self) -> Result<(), DbErr> {
        Migrator::fresh(&self.connection).await
    }

    /// Check database connectivity by executing a simple query.
    pub async fn ping(&self) -> Result<(), DbErr> {
        self.connection
            .execute(Statement::from_string(
                self.connection.get_database_backend(),
                "SELECT 1".to_string(),
            ))
            .await?;
        Ok(())
    }
}
