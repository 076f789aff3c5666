//! Domain events emitted by the account aggregate.
//!
//! Events are immutable facts used for audit and integration. They never drive
//! synchronous control flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::constants::{
    EVENT_ACCOUNT_ACTIVATED, EVENT_ACCOUNT_BLOCKED, EVENT_ACCOUNT_LOGGED_IN,
    EVENT_ACCOUNT_LOGGED_OUT, EVENT_ACCOUNT_REGISTERED, EVENT_PASSWORD_CHANGED,
};

/// Kind of account event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "user.registered")]
    Registered,
    #[serde(rename = "user.logged_in")]
    LoggedIn,
    #[serde(rename = "user.logged_out")]
    LoggedOut,
    #[serde(rename = "user.blocked")]
    Blocked,
    #[serde(rename = "user.activated")]
    Activated,
    #[serde(rename = "user.password_changed")]
    PasswordChanged,
}

impl EventKind {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Registered => EVENT_ACCOUNT_REGISTERED,
            EventKind::LoggedIn => EVENT_ACCOUNT_LOGGED_IN,
            EventKind::LoggedOut => EVENT_ACCOUNT_LOGGED_OUT,
            EventKind::Blocked => EVENT_ACCOUNT_BLOCKED,
            EventKind::Activated => EVENT_ACCOUNT_ACTIVATED,
            EventKind::PasswordChanged => EVENT_PASSWORD_CHANGED,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable fact about something that happened to an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub aggregate_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub payload: Value,
}

impl DomainEvent {
    fn new(kind: EventKind, aggregate_id: Uuid, occurred_at: DateTime<Utc>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            aggregate_id,
            occurred_at,
            payload,
        }
    }

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn registered(account_id: Uuid, email: &str, name: &str, at: DateTime<Utc>) -> Self {
        Self::new(
            EventKind::Registered,
            account_id,
            at,
            json!({ "email": email, "name": name }),
        )
    }

    pub fn logged_in(account_id: Uuid, email: &str, ip_address: &str, at: DateTime<Utc>) -> Self {
        Self::new(
            EventKind::LoggedIn,
            account_id,
            at,
            json!({ "email": email, "ip_address": ip_address }),
        )
    }

    /// Logout is recorded by the orchestrator, not by an aggregate mutator.
    pub fn logged_out(account_id: Uuid, at: DateTime<Utc>) -> Self {
        Self::new(EventKind::LoggedOut, account_id, at, json!({}))
    }

    pub fn blocked(account_id: Uuid, reason: &str, at: DateTime<Utc>) -> Self {
        Self::new(
            EventKind::Blocked,
            account_id,
            at,
            json!({ "reason": reason }),
        )
    }

    pub fn activated(account_id: Uuid, at: DateTime<Utc>) -> Self {
        Self::new(EventKind::Activated, account_id, at, json!({}))
    }

    pub fn password_changed(account_id: Uuid, at: DateTime<Utc>) -> Self {
        Self::new(EventKind::PasswordChanged, account_id, at, json!({}))
    }
}
