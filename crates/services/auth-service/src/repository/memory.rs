//! In-process account repository.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::Account;

use super::AccountRepository;

/// Account repository held in memory. The email index plays the role of the
/// database unique constraint: `create` checks and inserts under one lock.
#[derive(Clone, Default)]
pub struct InMemoryAccountRepository {
    inner: Arc<Mutex<Tables>>,
}

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    by_email: HashMap<String, Uuid>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub fn len(&self) -> usize {
        self.lock().map(|t| t.accounts.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.inner
            .lock()
            .map_err(|_| AppError::internal("Account repository lock poisoned"))
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn create(&self, account: &Account) -> AppResult<()> {
        let mut tables = self.lock()?;
        if tables.by_email.contains_key(&account.email) || tables.accounts.contains_key(&account.id) {
            return Err(AppError::AccountAlreadyExists);
        }

        tables.by_email.insert(account.email.clone(), account.id);
        tables.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let tables = self.lock()?;
        Ok(tables
            .by_email
            .get(email)
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        Ok(self.lock()?.accounts.get(&id).cloned())
    }

    async fn update(&self, account: &Account, expected_version: i64) -> AppResult<()> {
        let mut tables = self.lock()?;
        let previous_email = match tables.accounts.get(&account.id) {
            Some(stored) if stored.version != expected_version => {
                return Err(AppError::ConcurrentModification);
            }
            Some(stored) => stored.email.clone(),
            None => return Err(AppError::UserNotFound),
        };

        if previous_email != account.email {
            if tables.by_email.contains_key(&account.email) {
                return Err(AppError::AccountAlreadyExists);
            }
            tables.by_email.remove(&previous_email);
            tables.by_email.insert(account.email.clone(), account.id);
        }

        tables.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.lock()?;
        let removed = tables.accounts.remove(&id).ok_or(AppError::UserNotFound)?;
        tables.by_email.remove(&removed.email);
        Ok(())
    }

    async fn exists(&self, email: &str) -> AppResult<bool> {
        Ok(self.lock()?.by_email.contains_key(email))
    }
}
