use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::{AppError, AppResult, Clock, JwtConfig};
use domain::{Account, TokenPair, TokenType};

/// JWT claims payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    /// Present on access tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub token_type: TokenType,
    /// Token identity, used as the revocation key
    pub jti: Uuid,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub iss: String,
}

impl Claims {
    /// Instant at which this token stops being accepted.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Signs and verifies access and refresh tokens.
#[derive(Clone)]
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    issuer: String,
    clock: Arc<dyn Clock>,
}

impl TokenManager {
    /// Create a token manager from JWT settings.
    ///
    /// Fails if a TTL is outside the range `chrono::Duration` can hold.
    pub fn new(config: &JwtConfig, clock: Arc<dyn Clock>) -> AppResult<Self> {
        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_ttl: ttl("access", config.access_ttl_seconds)?,
            refresh_ttl: ttl("refresh", config.refresh_ttl_seconds)?,
            issuer: config.issuer.clone(),
            clock,
        })
    }

    /// Access token lifetime in seconds (the `expires_in` handed to clients).
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Sign an access token for `subject`, carrying its email.
    pub fn issue_access(&self, subject: Uuid, email: &str) -> AppResult<String> {
        let now = self.now();
        self.sign(self.claims(subject, Some(email.to_string()), TokenType::Access, now)?)
    }

    /// Sign a refresh token for `subject`. Refresh tokens carry no extra claims.
    pub fn issue_refresh(&self, subject: Uuid) -> AppResult<String> {
        let now = self.now();
        self.sign(self.claims(subject, None, TokenType::Refresh, now)?)
    }

    /// Issue a fresh access/refresh pair for an account.
    pub fn issue_pair(&self, account: &Account) -> AppResult<TokenPair> {
        let now = self.now();
        let access = self.sign(self.claims(
            account.id,
            Some(account.email.clone()),
            TokenType::Access,
            now,
        )?)?;
        let refresh = self.sign(self.claims(account.id, None, TokenType::Refresh, now)?)?;

        Ok(TokenPair::new(access, refresh, self.access_ttl_seconds(), now))
    }

    /// Verify a token's signature, issuer, type and time window.
    ///
    /// Returns `TokenExpired` once `exp <= now` and `TokenInvalid` for anything
    /// else that is wrong, including a token minted for the other entry point.
    pub fn validate(&self, token: &str, expected: TokenType) -> AppResult<Claims> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation())?.claims;

        if claims.user_id.is_nil() {
            return Err(AppError::TokenInvalid);
        }
        if claims.token_type != expected {
            tracing::debug!(
                expected = %expected,
                actual = %claims.token_type,
                "Token used at the wrong entry point"
            );
            return Err(AppError::TokenInvalid);
        }

        // The library checks `exp` against the wall clock; the injected clock is authoritative.
        let now = self.clock.now().timestamp();
        if claims.exp <= now {
            return Err(AppError::TokenExpired);
        }
        if claims.nbf > now {
            return Err(AppError::TokenInvalid);
        }

        Ok(claims)
    }

    /// Current instant truncated to whole seconds, the resolution of `iat`/`exp`.
    fn now(&self) -> DateTime<Utc> {
        let now = self.clock.now();
        DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now)
    }

    fn claims(
        &self,
        subject: Uuid,
        email: Option<String>,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> AppResult<Claims> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::internal(format!("{} token expiry out of range", token_type)))?;

        Ok(Claims {
            user_id: subject,
            email,
            token_type,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
        })
    }

    fn sign(&self, claims: Claims) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Token signing failed: {}", e)))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation
    }
}

fn ttl(name: &str, seconds: i64) -> AppResult<Duration> {
    Duration::try_seconds(seconds)
        .ok_or_else(|| AppError::internal(format!("JWT {} TTL of {}s is out of range", name, seconds)))
}
