//! Account aggregate and its status state machine.
//!
//! The aggregate is a plain value: every mutator borrows the current snapshot and
//! returns the next snapshot together with the events it emitted. Nothing is
//! buffered on the aggregate itself; callers persist the snapshot first and only
//! then hand the events to the publisher.
//!
//! ```text
//!   Active --deactivate--> Inactive
//!   Inactive --activate--> Active
//!   Active | Inactive --block--> Blocked   (terminal)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::credential::{canonical_email, validate_email};
use crate::error::{DomainError, DomainResult};
use crate::events::DomainEvent;

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_INACTIVE: &str = "inactive";
pub const STATUS_BLOCKED: &str = "blocked";

/// Account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
    Blocked,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => STATUS_ACTIVE,
            AccountStatus::Inactive => STATUS_INACTIVE,
            AccountStatus::Blocked => STATUS_BLOCKED,
        }
    }
}

// Unknown stored values map to Inactive so they never authenticate.
impl From<&str> for AccountStatus {
    fn from(s: &str) -> Self {
        match s {
            STATUS_ACTIVE => AccountStatus::Active,
            STATUS_BLOCKED => AccountStatus::Blocked,
            _ => AccountStatus::Inactive,
        }
    }
}

impl From<AccountStatus> for String {
    fn from(status: AccountStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of an account plus the events produced while reaching it.
pub type Transition = (Account, Vec<DomainEvent>);

/// Account aggregate root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    /// Bumped by every stamped change; stores write only over the version they loaded.
    pub version: i64,
}

impl Account {
    /// Create a new Active account and its `Registered` event.
    pub fn register(
        id: Uuid,
        email: &str,
        name: &str,
        password_hash: String,
        at: DateTime<Utc>,
    ) -> DomainResult<Transition> {
        let email = canonical_email(email);
        validate_email(&email)?;
        if password_hash.is_empty() {
            return Err(DomainError::EmptyPasswordHash);
        }

        let account = Self {
            id,
            email,
            name: name.trim().to_string(),
            password_hash,
            status: AccountStatus::Active,
            created_at: at,
            updated_at: at,
            last_login_at: None,
            version: 0,
        };
        let event = DomainEvent::registered(account.id, &account.email, &account.name, at);

        Ok((account, vec![event]))
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn is_blocked(&self) -> bool {
        self.status == AccountStatus::Blocked
    }

    /// Move to Active. Fails once the account is Blocked.
    pub fn activate(&self, at: DateTime<Utc>) -> DomainResult<Transition> {
        if self.is_blocked() {
            return Err(DomainError::AlreadyBlocked);
        }

        let next = self.stamped(at, |a| a.status = AccountStatus::Active);
        let event = DomainEvent::activated(self.id, at);
        Ok((next, vec![event]))
    }

    /// Move to Inactive. Always succeeds and emits nothing.
    ///
    /// A Blocked account is left Blocked: Blocked has no outgoing transition.
    pub fn deactivate(&self, at: DateTime<Utc>) -> Transition {
        if self.is_blocked() {
            return (self.clone(), Vec::new());
        }
        (self.stamped(at, |a| a.status = AccountStatus::Inactive), Vec::new())
    }

    /// Move to Blocked. Fails if already Blocked.
    pub fn block(&self, reason: &str, at: DateTime<Utc>) -> DomainResult<Transition> {
        if self.is_blocked() {
            return Err(DomainError::AlreadyBlocked);
        }

        let next = self.stamped(at, |a| a.status = AccountStatus::Blocked);
        let event = DomainEvent::blocked(self.id, reason, at);
        Ok((next, vec![event]))
    }

    /// Record a successful login. Status gating is the caller's concern.
    pub fn record_login(&self, ip_address: &str, at: DateTime<Utc>) -> Transition {
        let next = self.stamped(at, |a| a.last_login_at = Some(at));
        let event = DomainEvent::logged_in(self.id, &self.email, ip_address, at);
        (next, vec![event])
    }

    /// Replace the password hash.
    pub fn change_password(&self, new_hash: String, at: DateTime<Utc>) -> DomainResult<Transition> {
        if new_hash.is_empty() {
            return Err(DomainError::EmptyPasswordHash);
        }

        let next = self.stamped(at, |a| a.password_hash = new_hash);
        let event = DomainEvent::password_changed(self.id, at);
        Ok((next, vec![event]))
    }

    fn stamped(&self, at: DateTime<Utc>, change: impl FnOnce(&mut Account)) -> Account {
        let mut next = self.clone();
        change(&mut next);
        next.updated_at = at;
        next.version += 1;
        next
    }
}

/// Account projection (safe to return to callers)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            name: account.name.clone(),
            status: account.status,
            created_at: account.created_at,
            last_login_at: account.last_login_at,
        }
    }
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        AccountResponse::from(&account)
    }
}
