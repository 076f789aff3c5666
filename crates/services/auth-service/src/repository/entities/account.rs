//! Account database entity for SeaORM.

use sea_orm::entity::prelude::*;
use sea_orm::Set;

use domain::{Account, AccountStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub last_login_at: Option<DateTimeUtc>,
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Convert database model to domain aggregate
impl From<Model> for Account {
    fn from(model: Model) -> Self {
        Account {
            id: model.id,
            email: model.email,
            name: model.name,
            password_hash: model.password_hash,
            status: AccountStatus::from(model.status.as_str()),
            created_at: model.created_at,
            updated_at: model.updated_at,
            last_login_at: model.last_login_at,
            version: model.version,
        }
    }
}

/// Full-row active model for a domain aggregate
impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        ActiveModel {
            id: Set(account.id),
            email: Set(account.email.clone()),
            name: Set(account.name.clone()),
            password_hash: Set(account.password_hash.clone()),
            status: Set(account.status.as_str().to_string()),
            created_at: Set(account.created_at),
            updated_at: Set(account.updated_at),
            last_login_at: Set(account.last_login_at),
            version: Set(account.version),
        }
    }
}
