//! Token lifecycle orchestration.
//!
//! Composes the account repository, token manager, revocation store and event
//! bus into the register / login / validate / refresh / logout flows, plus the
//! account administration operations built on the same aggregate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use uuid::Uuid;

use crate::config::{AuthServiceConfig, FailMode, RevocationPolicy};
use crate::events::EventBus;
use crate::repository::AccountRepository;
use crate::revocation::{remaining_ttl, RevocationStore};
use crate::token::{Claims, TokenManager};
use common::{AppError, AppResult, Clock, OptionExt};
use domain::credential::{canonical_email, validate_password};
use domain::{
    Account, AccountResponse, AccountStatus, Credential, DomainEvent, Password, TokenPair,
    TokenType,
};

/// Hash verified when the email is unknown, so that path costs one argon2
/// verification like a wrong password does.
static DUMMY_HASH: Lazy<Option<Password>> =
    Lazy::new(|| Password::hash("dummy-password-for-timing").ok());

/// Token lifecycle operations, for dependency injection.
#[async_trait]
pub trait TokenLifecycle: Send + Sync {
    /// Create an Active account.
    async fn register(&self, email: &str, name: &str, password: &str) -> AppResult<AccountResponse>;

    /// Authenticate and issue an access/refresh pair.
    async fn login(&self, email: &str, password: &str, ip_address: &str) -> AppResult<TokenPair>;

    /// Resolve an access token to its account id.
    async fn validate_access(&self, access_token: &str) -> AppResult<Uuid>;

    /// Rotate a refresh token into a new pair.
    async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair>;

    /// Revoke an access token.
    async fn logout(&self, access_token: &str) -> AppResult<()>;

    /// Public projection of an Active account.
    async fn get_account(&self, account_id: Uuid) -> AppResult<AccountResponse>;

    /// Replace the password after verifying the current one.
    async fn change_password(
        &self,
        account_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()>;

    async fn block_account(&self, account_id: Uuid, reason: &str) -> AppResult<AccountResponse>;

    async fn deactivate_account(&self, account_id: Uuid) -> AppResult<AccountResponse>;

    async fn activate_account(&self, account_id: Uuid) -> AppResult<AccountResponse>;
}

/// Runtime knobs of the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleSettings {
    pub revocation: RevocationPolicy,
    pub revocation_ttl_floor: Duration,
    pub event_publish_timeout: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        (&AuthServiceConfig::default()).into()
    }
}

impl From<&AuthServiceConfig> for LifecycleSettings {
    fn from(config: &AuthServiceConfig) -> Self {
        Self {
            revocation: config.revocation,
            revocation_ttl_floor: config.revocation_ttl_floor(),
            event_publish_timeout: config.event_publish_timeout(),
        }
    }
}

/// Revocation read sites with a configurable fail mode.
#[derive(Debug, Clone, Copy)]
enum CheckSite {
    ValidateAccess,
    Refresh,
}

impl CheckSite {
    fn name(self) -> &'static str {
        match self {
            CheckSite::ValidateAccess => "validate_access",
            CheckSite::Refresh => "refresh",
        }
    }
}

/// Concrete implementation of TokenLifecycle.
pub struct TokenLifecycleService {
    accounts: Arc<dyn AccountRepository>,
    revocations: Arc<dyn RevocationStore>,
    events: Arc<dyn EventBus>,
    tokens: TokenManager,
    clock: Arc<dyn Clock>,
    settings: LifecycleSettings,
}

impl TokenLifecycleService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        revocations: Arc<dyn RevocationStore>,
        events: Arc<dyn EventBus>,
        tokens: TokenManager,
        clock: Arc<dyn Clock>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            accounts,
            revocations,
            events,
            tokens,
            clock,
            settings,
        }
    }

    /// Publish events in order, one attempt each within the publish budget.
    /// Failures are logged and never reach the caller.
    async fn publish_events(&self, events: Vec<DomainEvent>) {
        for event in events {
            match tokio::time::timeout(self.settings.event_publish_timeout, self.events.publish(&event))
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(
                    event = %event.name(),
                    aggregate_id = %event.aggregate_id,
                    error = %e,
                    "Failed to publish domain event"
                ),
                Err(_) => tracing::warn!(
                    event = %event.name(),
                    aggregate_id = %event.aggregate_id,
                    timeout_ms = self.settings.event_publish_timeout.as_millis() as u64,
                    "Timed out publishing domain event"
                ),
            }
        }
    }

    /// Revocation lookup honouring the fail mode configured for `site`.
    async fn is_revoked(&self, claims: &Claims, site: CheckSite) -> AppResult<bool> {
        let mode = match site {
            CheckSite::ValidateAccess => self.settings.revocation.on_validate_access,
            CheckSite::Refresh => self.settings.revocation.on_refresh,
        };

        match self.revocations.exists(&claims.jti.to_string()).await {
            Ok(revoked) => Ok(revoked),
            Err(e) if mode == FailMode::Open => {
                tracing::warn!(
                    site = site.name(),
                    token_id = %claims.jti,
                    error = %e,
                    "Revocation store unavailable, failing open"
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Write a deny record covering the rest of the token's lifetime.
    async fn revoke(&self, claims: &Claims) -> AppResult<()> {
        let ttl = remaining_ttl(
            claims.expires_at(),
            self.clock.now(),
            self.settings.revocation_ttl_floor,
        );
        self.revocations.add(&claims.jti.to_string(), ttl).await
    }

    async fn load(&self, account_id: Uuid) -> AppResult<Account> {
        self.accounts.get_by_id(account_id).await?.ok_or_user_not_found()
    }

    async fn load_active(&self, account_id: Uuid) -> AppResult<Account> {
        let account = self.load(account_id).await?;
        if !account.is_active() {
            return Err(AppError::AccountInactive);
        }
        Ok(account)
    }

    /// Persist a transition over the snapshot it was derived from.
    ///
    /// Fails with `ConcurrentModification` if the stored account moved on since
    /// `loaded` was read, so a stale snapshot never undoes a Block.
    async fn commit(
        &self,
        loaded: &Account,
        (account, events): (Account, Vec<DomainEvent>),
    ) -> AppResult<Account> {
        self.accounts.update(&account, loaded.version).await?;
        self.publish_events(events).await;
        Ok(account)
    }
}

#[async_trait]
impl TokenLifecycle for TokenLifecycleService {
    #[tracing::instrument(skip(self, password))]
    async fn register(&self, email: &str, name: &str, password: &str) -> AppResult<AccountResponse> {
        let credential = Credential::new(email, password)?;

        if self.accounts.exists(credential.email()).await? {
            return Err(AppError::AccountAlreadyExists);
        }

        let hash = Password::hash(credential.password())?.into_string();
        let (account, events) =
            Account::register(Uuid::new_v4(), credential.email(), name, hash, self.clock.now())?;

        // A concurrent registration can pass `exists`; the store constraint decides.
        self.accounts.create(&account).await?;
        self.publish_events(events).await;

        tracing::info!(account_id = %account.id, "Account registered");
        Ok(account.into())
    }

    #[tracing::instrument(skip(self, password))]
    async fn login(&self, email: &str, password: &str, ip_address: &str) -> AppResult<TokenPair> {
        let account = match self.accounts.get_by_email(&canonical_email(email)).await? {
            Some(account) => account,
            None => {
                if let Some(dummy) = DUMMY_HASH.as_ref() {
                    let _ = dummy.verify(password);
                }
                return Err(AppError::InvalidCredentials);
            }
        };

        match account.status {
            AccountStatus::Blocked => return Err(AppError::AccountBlocked),
            AccountStatus::Inactive => return Err(AppError::AccountInactive),
            AccountStatus::Active => {}
        }

        if !Password::from_hash(account.password_hash.as_str()).verify(password)? {
            return Err(AppError::InvalidCredentials);
        }

        let loaded_version = account.version;
        let (account, events) = account.record_login(ip_address, self.clock.now());
        self.accounts.update(&account, loaded_version).await?;

        let pair = self.tokens.issue_pair(&account)?;
        self.publish_events(events).await;

        tracing::info!(account_id = %account.id, "Login succeeded");
        Ok(pair)
    }

    #[tracing::instrument(skip_all)]
    async fn validate_access(&self, access_token: &str) -> AppResult<Uuid> {
        let claims = self.tokens.validate(access_token, TokenType::Access)?;

        if self.is_revoked(&claims, CheckSite::ValidateAccess).await? {
            return Err(AppError::TokenRevoked);
        }

        let account = self.load_active(claims.user_id).await?;
        Ok(account.id)
    }

    #[tracing::instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let claims = self.tokens.validate(refresh_token, TokenType::Refresh)?;

        if self.is_revoked(&claims, CheckSite::Refresh).await? {
            return Err(AppError::TokenRevoked);
        }

        let account = self.load_active(claims.user_id).await?;

        // Rotation. The access token paired with the old refresh token stays
        // valid until it expires.
        self.revoke(&claims).await?;

        let pair = self.tokens.issue_pair(&account)?;
        tracing::info!(account_id = %account.id, "Refresh token rotated");
        Ok(pair)
    }

    #[tracing::instrument(skip_all)]
    async fn logout(&self, access_token: &str) -> AppResult<()> {
        let claims = self.tokens.validate(access_token, TokenType::Access)?;

        self.revoke(&claims).await?;
        self.publish_events(vec![DomainEvent::logged_out(claims.user_id, self.clock.now())])
            .await;

        tracing::info!(account_id = %claims.user_id, "Logged out");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get_account(&self, account_id: Uuid) -> AppResult<AccountResponse> {
        Ok(self.load_active(account_id).await?.into())
    }

    #[tracing::instrument(skip(self, current_password, new_password))]
    async fn change_password(
        &self,
        account_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        validate_password(new_password)?;

        let account = self.load_active(account_id).await?;
        if !Password::from_hash(account.password_hash.as_str()).verify(current_password)? {
            return Err(AppError::InvalidCredentials);
        }

        let hash = Password::hash(new_password)?.into_string();
        self.commit(&account, account.change_password(hash, self.clock.now())?)
            .await?;

        tracing::info!(account_id = %account_id, "Password changed");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn block_account(&self, account_id: Uuid, reason: &str) -> AppResult<AccountResponse> {
        let account = self.load(account_id).await?;
        let account = self
            .commit(&account, account.block(reason, self.clock.now())?)
            .await?;

        tracing::info!(account_id = %account_id, "Account blocked");
        Ok(account.into())
    }

    #[tracing::instrument(skip(self))]
    async fn deactivate_account(&self, account_id: Uuid) -> AppResult<AccountResponse> {
        let account = self.load(account_id).await?;
        let account = self.commit(&account, account.deactivate(self.clock.now())).await?;
        Ok(account.into())
    }

    #[tracing::instrument(skip(self))]
    async fn activate_account(&self, account_id: Uuid) -> AppResult<AccountResponse> {
        let account = self.load(account_id).await?;
        let account = self
            .commit(&account, account.activate(self.clock.now())?)
            .await?;
        Ok(account.into())
    }
}
