//! Account repository backed by PostgreSQL through SeaORM.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    SqlErr,
};
use uuid::Uuid;

use super::entities::account::{ActiveModel, Column, Entity as AccountEntity};
use common::{AppError, AppResult};
use domain::Account;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Account repository trait for dependency injection.
///
/// Email uniqueness is enforced by the store at write time; `create` reports a
/// violation as `AccountAlreadyExists` even when an earlier `exists` check
/// passed. `update` is a compare-and-set on the account version, so a snapshot
/// loaded before a concurrent write can never overwrite it.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a new account
    async fn create(&self, account: &Account) -> AppResult<()>;

    /// Find account by canonical email
    async fn get_by_email(&self, email: &str) -> AppResult<Option<Account>>;

    /// Find account by ID
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Account>>;

    /// Overwrite a stored account with this snapshot if the stored version is
    /// still `expected_version`; `ConcurrentModification` otherwise
    async fn update(&self, account: &Account, expected_version: i64) -> AppResult<()>;

    /// Permanently delete an account
    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Whether an account with this canonical email exists
    async fn exists(&self, email: &str) -> AppResult<bool>;
}

/// Concrete implementation of AccountRepository
pub struct AccountStore {
    db: DatabaseConnection,
}

impl AccountStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountRepository for AccountStore {
    async fn create(&self, account: &Account) -> AppResult<()> {
        match ActiveModel::from(account).insert(&self.db).await {
            Ok(_) => Ok(()),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(AppError::AccountAlreadyExists),
                _ => Err(AppError::from(err)),
            },
        }
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let result = AccountEntity::find()
            .filter(Column::Email.eq(email))
            .one(&self.db)
            .await?;

        Ok(result.map(Account::from))
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        let result = AccountEntity::find_by_id(id).one(&self.db).await?;
        Ok(result.map(Account::from))
    }

    async fn update(&self, account: &Account, expected_version: i64) -> AppResult<()> {
        let result = AccountEntity::update_many()
            .set(ActiveModel::from(account))
            .filter(Column::Id.eq(account.id))
            .filter(Column::Version.eq(expected_version))
            .exec(&self.db)
            .await;

        match result {
            Ok(updated) if updated.rows_affected > 0 => Ok(()),
            Ok(_) => match AccountEntity::find_by_id(account.id).one(&self.db).await? {
                Some(_) => Err(AppError::ConcurrentModification),
                None => Err(AppError::UserNotFound),
            },
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(AppError::AccountAlreadyExists),
                _ => Err(AppError::from(err)),
            },
        }
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = AccountEntity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(AppError::UserNotFound);
        }

        Ok(())
    }

    async fn exists(&self, email: &str) -> AppResult<bool> {
        let count = AccountEntity::find()
            .filter(Column::Email.eq(email))
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::repository::entities::account;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult, RuntimeErr};

    fn model(id: Uuid) -> account::Model {
        let now = Utc::now();
        account::Model {
            id,
            email: "a@b.com".to_string(),
            name: "Alice".to_string(),
            password_hash: "hash".to_string(),
            status: "blocked".to_string(),
            created_at: now,
            updated_at: now,
            last_login_at: None,
            version: 3,
        }
    }

    #[tokio::test]
    async fn test_get_by_id_maps_status() {
        let id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(id)]])
            .into_connection();

        let account = AccountStore::new(db).get_by_id(id).await.unwrap().unwrap();
        assert_eq!(account.id, id);
        assert!(account.is_blocked());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let result = AccountStore::new(db).delete(Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_update_over_stale_version_is_conflict() {
        let id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![model(id)]])
            .into_connection();

        let stale = Account::from(model(id));
        let result = AccountStore::new(db).update(&stale, 2).await;
        assert!(matches!(result, Err(AppError::ConcurrentModification)));
    }

    #[tokio::test]
    async fn test_update_matching_version() {
        let id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let account = Account::from(model(id));
        assert!(AccountStore::new(db).update(&account, 3).await.is_ok());
    }

    #[tokio::test]
    async fn test_connection_failure_is_store_unavailable() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Conn(RuntimeErr::Internal("refused".into()))])
            .into_connection();

        let result = AccountStore::new(db).get_by_email("a@b.com").await;
        assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
    }
}
