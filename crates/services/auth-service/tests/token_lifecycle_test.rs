//! Integration tests for the token lifecycle.
//!
//! These drive the service through the in-memory account repository,
//! revocation store and event bus with a manually advanced clock, so no
//! database or Redis connection is required.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use auth_service_lib::config::{FailMode, RevocationPolicy};
use auth_service_lib::events::InMemoryEventBus;
use auth_service_lib::repository::{AccountRepository, InMemoryAccountRepository};
use auth_service_lib::revocation::{InMemoryRevocationStore, RevocationStore};
use auth_service_lib::service::{LifecycleSettings, TokenLifecycle, TokenLifecycleService};
use auth_service_lib::token::TokenManager;
use common::{AppError, AppResult, Clock, JwtConfig, ManualClock};
use domain::{Account, AccountStatus, EventKind, Password};

const SECRET: &str = "test-secret-key-for-testing-only-32chars";
const EMAIL: &str = "a@b.com";
const NAME: &str = "Alice";
const PASSWORD: &str = "Passw0rd1";
const IP: &str = "10.0.0.1";

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    service: Arc<TokenLifecycleService>,
    accounts: InMemoryAccountRepository,
    events: InMemoryEventBus,
    clock: ManualClock,
}

impl Harness {
    fn new() -> Self {
        Self::with_revocations(None, LifecycleSettings::default())
    }

    fn with_revocations(store: Option<Arc<dyn RevocationStore>>, settings: LifecycleSettings) -> Self {
        Self::build(store, settings, |accounts| Arc::new(accounts))
    }

    /// Service whose account repository is `wrap` applied to the shared in-memory store.
    fn with_accounts(
        wrap: impl FnOnce(InMemoryAccountRepository) -> Arc<dyn AccountRepository>,
    ) -> Self {
        Self::build(None, LifecycleSettings::default(), wrap)
    }

    fn build(
        store: Option<Arc<dyn RevocationStore>>,
        settings: LifecycleSettings,
        wrap: impl FnOnce(InMemoryAccountRepository) -> Arc<dyn AccountRepository>,
    ) -> Self {
        let clock = ManualClock::default();
        let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
        let accounts = InMemoryAccountRepository::new();
        let events = InMemoryEventBus::new();
        let revocations =
            store.unwrap_or_else(|| Arc::new(InMemoryRevocationStore::new(shared_clock.clone())));

        let jwt = JwtConfig {
            secret: SECRET.to_string(),
            ..JwtConfig::default()
        };
        let service = TokenLifecycleService::new(
            wrap(accounts.clone()),
            revocations,
            Arc::new(events.clone()),
            TokenManager::new(&jwt, shared_clock.clone()).unwrap(),
            shared_clock,
            settings,
        );

        Self {
            service: Arc::new(service),
            accounts,
            events,
            clock,
        }
    }

    async fn registered(&self) -> Uuid {
        self.service.register(EMAIL, NAME, PASSWORD).await.unwrap().id
    }
}

/// Revocation store whose backend is unreachable.
struct UnreachableStore;

#[async_trait]
impl RevocationStore for UnreachableStore {
    async fn add(&self, _token_id: &str, _ttl: StdDuration) -> AppResult<()> {
        Err(AppError::store_unavailable("connection refused"))
    }

    async fn exists(&self, _token_id: &str) -> AppResult<bool> {
        Err(AppError::store_unavailable("connection refused"))
    }
}

/// Account repository that blocks the account in the backing store right
/// after handing out a snapshot by email, as an administrator racing a login would.
struct BlockAfterRead {
    inner: InMemoryAccountRepository,
}

#[async_trait]
impl AccountRepository for BlockAfterRead {
    async fn create(&self, account: &Account) -> AppResult<()> {
        self.inner.create(account).await
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let snapshot = self.inner.get_by_email(email).await?;
        if let Some(account) = &snapshot {
            let (blocked, _) = account.block("fraud", Utc::now())?;
            self.inner.update(&blocked, account.version).await?;
        }
        Ok(snapshot)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        self.inner.get_by_id(id).await
    }

    async fn update(&self, account: &Account, expected_version: i64) -> AppResult<()> {
        self.inner.update(account, expected_version).await
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.inner.delete(id).await
    }

    async fn exists(&self, email: &str) -> AppResult<bool> {
        self.inner.exists(email).await
    }
}

// =============================================================================
// Register / Login / ValidateAccess / Logout
// =============================================================================

#[tokio::test]
async fn test_full_lifecycle() {
    let h = Harness::new();

    let account = h.service.register(EMAIL, NAME, PASSWORD).await.unwrap();
    assert_eq!(account.status, AccountStatus::Active);

    let pair = h.service.login(EMAIL, PASSWORD, IP).await.unwrap();
    assert_eq!(pair.expires_in, 3600);
    assert_eq!(pair.token_type, "Bearer");
    assert_ne!(pair.access_token, pair.refresh_token);

    let subject = h.service.validate_access(&pair.access_token).await.unwrap();
    assert_eq!(subject, account.id);

    h.service.logout(&pair.access_token).await.unwrap();

    let result = h.service.validate_access(&pair.access_token).await;
    assert!(matches!(result, Err(AppError::TokenRevoked)));

    let kinds: Vec<_> = h.events.published().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![EventKind::Registered, EventKind::LoggedIn, EventKind::LoggedOut]
    );
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let h = Harness::new();
    h.registered().await;

    let result = h.service.register("  A@B.COM ", "Other", PASSWORD).await;

    assert!(matches!(result, Err(AppError::AccountAlreadyExists)));
    assert_eq!(h.events.count(EventKind::Registered), 1);
    assert_eq!(h.accounts.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_yields_one_account() {
    let h = Harness::new();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let service = h.service.clone();
            tokio::spawn(async move { service.register(EMAIL, NAME, PASSWORD).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) => assert!(matches!(e, AppError::AccountAlreadyExists)),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(h.accounts.len(), 1);
    assert_eq!(h.events.count(EventKind::Registered), 1);
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let h = Harness::new();
    let id = h.registered().await;

    let pair = h.service.login(" A@B.Com", PASSWORD, IP).await.unwrap();

    assert_eq!(h.service.validate_access(&pair.access_token).await.unwrap(), id);
}

#[tokio::test]
async fn test_login_wrong_password_and_unknown_email_look_the_same() {
    let h = Harness::new();
    h.registered().await;

    let wrong = h.service.login(EMAIL, "Wrong-Passw0rd", IP).await;
    let unknown = h.service.login("ghost@b.com", PASSWORD, IP).await;

    assert!(matches!(wrong, Err(AppError::InvalidCredentials)));
    assert!(matches!(unknown, Err(AppError::InvalidCredentials)));
    assert_eq!(h.events.count(EventKind::LoggedIn), 0);
}

#[tokio::test]
async fn test_login_records_last_login() {
    let h = Harness::new();
    let id = h.registered().await;

    h.service.login(EMAIL, PASSWORD, IP).await.unwrap();

    let stored = h.accounts.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.last_login_at, Some(h.clock.now()));

    let event = h
        .events
        .published()
        .into_iter()
        .find(|e| e.kind == EventKind::LoggedIn)
        .unwrap();
    assert_eq!(event.payload["ip_address"], IP);
}

#[tokio::test]
async fn test_blocked_account_cannot_login_with_any_password() {
    let h = Harness::new();
    let id = h.registered().await;
    h.service.block_account(id, "fraud").await.unwrap();

    for password in [PASSWORD, "Wrong-Passw0rd"] {
        let result = h.service.login(EMAIL, password, IP).await;
        assert!(matches!(result, Err(AppError::AccountBlocked)));
    }
}

#[tokio::test]
async fn test_block_during_login_is_not_overwritten() {
    let h = Harness::with_accounts(|accounts| Arc::new(BlockAfterRead { inner: accounts }));
    let id = h.registered().await;

    let err = assert_err!(h.service.login(EMAIL, PASSWORD, IP).await);
    assert!(matches!(err, AppError::ConcurrentModification));
    assert!(err.is_retryable());

    let stored = h.accounts.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.status, AccountStatus::Blocked);
    assert!(stored.last_login_at.is_none());
    assert_eq!(h.events.count(EventKind::LoggedIn), 0);
}

#[tokio::test]
async fn test_blocking_invalidates_outstanding_tokens() {
    let h = Harness::new();
    let id = h.registered().await;
    let pair = h.service.login(EMAIL, PASSWORD, IP).await.unwrap();

    h.service.block_account(id, "fraud").await.unwrap();

    let access = h.service.validate_access(&pair.access_token).await;
    let refresh = h.service.refresh(&pair.refresh_token).await;
    assert!(matches!(access, Err(AppError::AccountInactive)));
    assert!(matches!(refresh, Err(AppError::AccountInactive)));
}

#[tokio::test]
async fn test_access_token_expires() {
    let h = Harness::new();
    h.registered().await;
    let pair = h.service.login(EMAIL, PASSWORD, IP).await.unwrap();

    h.clock.advance(Duration::seconds(3599));
    assert_ok!(h.service.validate_access(&pair.access_token).await);

    h.clock.advance(Duration::seconds(1));
    let result = h.service.validate_access(&pair.access_token).await;
    assert!(matches!(result, Err(AppError::TokenExpired)));
}

#[tokio::test]
async fn test_logout_near_expiry_still_denies() {
    let h = Harness::new();
    h.registered().await;
    let pair = h.service.login(EMAIL, PASSWORD, IP).await.unwrap();

    h.clock.advance(Duration::seconds(3598));
    h.service.logout(&pair.access_token).await.unwrap();

    h.clock.advance(Duration::seconds(1));
    let result = h.service.validate_access(&pair.access_token).await;
    assert!(matches!(result, Err(AppError::TokenRevoked)));
}

#[tokio::test]
async fn test_token_never_logged_out_stays_valid() {
    let h = Harness::new();
    let id = h.registered().await;
    let first = h.service.login(EMAIL, PASSWORD, IP).await.unwrap();
    let second = h.service.login(EMAIL, PASSWORD, IP).await.unwrap();

    h.service.logout(&first.access_token).await.unwrap();

    assert_eq!(h.service.validate_access(&second.access_token).await.unwrap(), id);
}

#[tokio::test]
async fn test_garbage_token_is_invalid() {
    let h = Harness::new();

    let result = h.service.validate_access("not.a.token").await;
    assert!(matches!(result, Err(AppError::TokenInvalid)));
}

// =============================================================================
// Refresh
// =============================================================================

#[tokio::test]
async fn test_refresh_rotates_once() {
    let h = Harness::new();
    let id = h.registered().await;
    let original = h.service.login(EMAIL, PASSWORD, IP).await.unwrap();

    let rotated = h.service.refresh(&original.refresh_token).await.unwrap();
    assert_eq!(h.service.validate_access(&rotated.access_token).await.unwrap(), id);

    let replay = h.service.refresh(&original.refresh_token).await;
    assert!(matches!(replay, Err(AppError::TokenRevoked)));

    // The rotated pair keeps working.
    assert_ok!(h.service.refresh(&rotated.refresh_token).await);
}

#[tokio::test]
async fn test_access_token_survives_refresh_rotation_until_expiry() {
    let h = Harness::new();
    let id = h.registered().await;
    let original = h.service.login(EMAIL, PASSWORD, IP).await.unwrap();

    h.service.refresh(&original.refresh_token).await.unwrap();

    assert_eq!(h.service.validate_access(&original.access_token).await.unwrap(), id);

    h.clock.advance(Duration::seconds(3600));
    let result = h.service.validate_access(&original.access_token).await;
    assert!(matches!(result, Err(AppError::TokenExpired)));
}

#[tokio::test]
async fn test_tokens_are_bound_to_their_entry_point() {
    let h = Harness::new();
    h.registered().await;
    let pair = h.service.login(EMAIL, PASSWORD, IP).await.unwrap();

    let refresh_as_access = h.service.validate_access(&pair.refresh_token).await;
    let access_as_refresh = h.service.refresh(&pair.access_token).await;
    let refresh_logout = h.service.logout(&pair.refresh_token).await;

    assert!(matches!(refresh_as_access, Err(AppError::TokenInvalid)));
    assert!(matches!(access_as_refresh, Err(AppError::TokenInvalid)));
    assert!(matches!(refresh_logout, Err(AppError::TokenInvalid)));
}

#[tokio::test]
async fn test_refresh_token_outlives_access_token() {
    let h = Harness::new();
    h.registered().await;
    let pair = h.service.login(EMAIL, PASSWORD, IP).await.unwrap();

    h.clock.advance(Duration::days(6));
    assert_ok!(h.service.refresh(&pair.refresh_token).await);
}

#[tokio::test]
async fn test_refresh_for_deleted_account() {
    let h = Harness::new();
    let id = h.registered().await;
    let pair = h.service.login(EMAIL, PASSWORD, IP).await.unwrap();

    h.accounts.delete(id).await.unwrap();

    let result = h.service.refresh(&pair.refresh_token).await;
    assert!(matches!(result, Err(AppError::UserNotFound)));
}

// =============================================================================
// Account administration
// =============================================================================

#[tokio::test]
async fn test_change_password() {
    let h = Harness::new();
    let id = h.registered().await;
    let old_hash = h.accounts.get_by_id(id).await.unwrap().unwrap().password_hash;

    h.service
        .change_password(id, PASSWORD, "N3wPassword")
        .await
        .unwrap();

    assert_eq!(h.events.count(EventKind::PasswordChanged), 1);

    let new_hash = h.accounts.get_by_id(id).await.unwrap().unwrap().password_hash;
    assert!(Password::from_hash(new_hash).verify("N3wPassword").unwrap());
    assert!(!Password::from_hash(old_hash).verify("N3wPassword").unwrap());

    assert_ok!(h.service.login(EMAIL, "N3wPassword", IP).await);
    let old = h.service.login(EMAIL, PASSWORD, IP).await;
    assert!(matches!(old, Err(AppError::InvalidCredentials)));
}

#[tokio::test]
async fn test_change_password_rejects_wrong_current_and_weak_new() {
    let h = Harness::new();
    let id = h.registered().await;

    let wrong = h.service.change_password(id, "Wrong-Passw0rd", "N3wPassword").await;
    let weak = h.service.change_password(id, PASSWORD, "alllowercase1").await;

    assert!(matches!(wrong, Err(AppError::InvalidCredentials)));
    assert!(matches!(weak, Err(AppError::PasswordTooWeak)));
    assert_eq!(h.events.count(EventKind::PasswordChanged), 0);
}

#[tokio::test]
async fn test_deactivate_and_activate() {
    let h = Harness::new();
    let id = h.registered().await;

    let inactive = h.service.deactivate_account(id).await.unwrap();
    assert_eq!(inactive.status, AccountStatus::Inactive);
    let result = h.service.login(EMAIL, PASSWORD, IP).await;
    assert!(matches!(result, Err(AppError::AccountInactive)));
    let result = h.service.get_account(id).await;
    assert!(matches!(result, Err(AppError::AccountInactive)));

    let active = h.service.activate_account(id).await.unwrap();
    assert_eq!(active.status, AccountStatus::Active);
    assert_ok!(h.service.login(EMAIL, PASSWORD, IP).await);

    assert_eq!(h.events.count(EventKind::Activated), 1);
}

#[tokio::test]
async fn test_blocked_is_terminal() {
    let h = Harness::new();
    let id = h.registered().await;
    h.service.block_account(id, "fraud").await.unwrap();

    let activate = h.service.activate_account(id).await;
    let block = h.service.block_account(id, "again").await;
    let deactivated = h.service.deactivate_account(id).await.unwrap();

    assert!(matches!(activate, Err(AppError::AlreadyBlocked)));
    assert!(matches!(block, Err(AppError::AlreadyBlocked)));
    assert_eq!(deactivated.status, AccountStatus::Blocked);
    assert_eq!(h.events.count(EventKind::Blocked), 1);
}

#[tokio::test]
async fn test_get_account_projection_hides_hash() {
    let h = Harness::new();
    let id = h.registered().await;

    let account = h.service.get_account(id).await.unwrap();
    assert_eq!(account.email, EMAIL);
    assert_eq!(account.name, NAME);

    let json = serde_json::to_value(&account).unwrap();
    assert!(json.get("password_hash").is_none());

    let missing = h.service.get_account(Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::UserNotFound)));
}

// =============================================================================
// Degraded collaborators
// =============================================================================

#[tokio::test]
async fn test_operations_succeed_with_event_bus_offline() {
    let h = Harness::new();
    h.events.set_offline(true);

    let id = h.registered().await;
    let pair = h.service.login(EMAIL, PASSWORD, IP).await.unwrap();
    h.service.logout(&pair.access_token).await.unwrap();
    h.service.block_account(id, "fraud").await.unwrap();

    assert!(h.events.published().is_empty());
    assert!(h.accounts.get_by_id(id).await.unwrap().unwrap().is_blocked());
}

#[tokio::test]
async fn test_unreachable_revocation_store_fails_closed_by_default() {
    let h = Harness::with_revocations(Some(Arc::new(UnreachableStore)), LifecycleSettings::default());
    h.registered().await;
    let pair = h.service.login(EMAIL, PASSWORD, IP).await.unwrap();

    let validate = h.service.validate_access(&pair.access_token).await;
    let refresh = h.service.refresh(&pair.refresh_token).await;
    let logout = h.service.logout(&pair.access_token).await;

    assert!(matches!(validate, Err(AppError::StoreUnavailable(_))));
    assert!(matches!(refresh, Err(AppError::StoreUnavailable(_))));
    assert!(matches!(logout, Err(AppError::StoreUnavailable(_))));
    assert_eq!(h.events.count(EventKind::LoggedOut), 0);
}

#[tokio::test]
async fn test_unreachable_revocation_store_fail_open_reads_only() {
    let settings = LifecycleSettings {
        revocation: RevocationPolicy {
            on_validate_access: FailMode::Open,
            on_refresh: FailMode::Open,
        },
        ..LifecycleSettings::default()
    };
    let h = Harness::with_revocations(Some(Arc::new(UnreachableStore)), settings);
    let id = h.registered().await;
    let pair = h.service.login(EMAIL, PASSWORD, IP).await.unwrap();

    assert_eq!(h.service.validate_access(&pair.access_token).await.unwrap(), id);

    // Rotation and logout write to the store and never fail open.
    let refresh = h.service.refresh(&pair.refresh_token).await;
    let logout = h.service.logout(&pair.access_token).await;
    assert!(matches!(refresh, Err(AppError::StoreUnavailable(_))));
    assert!(matches!(logout, Err(AppError::StoreUnavailable(_))));
}
