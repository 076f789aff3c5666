//! Auth service configuration.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use common::{CacheConfig, DatabaseConfig, EventBusConfig, JwtConfig};
use domain::{DEFAULT_REVOCATION_TTL_FLOOR_SECONDS, MAX_TOKEN_TTL_SECONDS, MIN_JWT_SECRET_LENGTH};

/// Configuration loading errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// What to do when the revocation store cannot answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailMode {
    /// Treat the token as revoked and fail the request
    Closed,
    /// Treat the token as not revoked and log a warning
    Open,
}

impl FromStr for FailMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "closed" => Ok(FailMode::Closed),
            "open" => Ok(FailMode::Open),
            other => Err(format!("expected `open` or `closed`, got `{}`", other)),
        }
    }
}

/// Fail mode for each revocation *read*.
///
/// Revocation writes (logout and refresh rotation) are always fail-closed and
/// have no setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevocationPolicy {
    pub on_validate_access: FailMode,
    pub on_refresh: FailMode,
}

impl Default for RevocationPolicy {
    fn default() -> Self {
        Self {
            on_validate_access: FailMode::Closed,
            on_refresh: FailMode::Closed,
        }
    }
}

/// Auth service configuration.
#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    pub jwt: JwtConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub events: EventBusConfig,
    pub revocation: RevocationPolicy,
    /// Minimum lifetime of a revocation record in seconds
    pub revocation_ttl_floor_seconds: i64,
}

impl Default for AuthServiceConfig {
    fn default() -> Self {
        Self {
            jwt: JwtConfig::default(),
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            events: EventBusConfig::default(),
            revocation: RevocationPolicy::default(),
            revocation_ttl_floor_seconds: DEFAULT_REVOCATION_TTL_FLOOR_SECONDS,
        }
    }
}

impl AuthServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET")
                    .or_else(|_| env::var("AUTH_SERVICE_JWT_SECRET"))
                    .map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
                access_ttl_seconds: parse_var("JWT_ACCESS_TTL_SECONDS", defaults.jwt.access_ttl_seconds)?,
                refresh_ttl_seconds: parse_var(
                    "JWT_REFRESH_TTL_SECONDS",
                    defaults.jwt.refresh_ttl_seconds,
                )?,
                issuer: env::var("JWT_ISSUER").unwrap_or(defaults.jwt.issuer),
            },
            database: DatabaseConfig {
                url: env::var("AUTH_SERVICE_DATABASE_URL")
                    .or_else(|_| env::var("DATABASE_URL"))
                    .unwrap_or(defaults.database.url),
                ..defaults.database
            },
            cache: CacheConfig {
                url: env::var("AUTH_SERVICE_REDIS_URL")
                    .or_else(|_| env::var("REDIS_URL"))
                    .unwrap_or(defaults.cache.url),
            },
            events: EventBusConfig {
                stream_key: env::var("EVENT_STREAM_KEY").unwrap_or(defaults.events.stream_key),
                publish_timeout_ms: parse_var(
                    "EVENT_PUBLISH_TIMEOUT_MS",
                    defaults.events.publish_timeout_ms,
                )?,
            },
            revocation: RevocationPolicy {
                on_validate_access: parse_var(
                    "REVOCATION_ON_VALIDATE",
                    defaults.revocation.on_validate_access,
                )?,
                on_refresh: parse_var("REVOCATION_ON_REFRESH", defaults.revocation.on_refresh)?,
            },
            revocation_ttl_floor_seconds: parse_var(
                "REVOCATION_TTL_FLOOR_SECONDS",
                defaults.revocation_ttl_floor_seconds,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET",
                reason: format!("must be at least {} characters", MIN_JWT_SECRET_LENGTH),
            });
        }
        check_ttl("JWT_ACCESS_TTL_SECONDS", self.jwt.access_ttl_seconds)?;
        check_ttl("JWT_REFRESH_TTL_SECONDS", self.jwt.refresh_ttl_seconds)?;
        check_ttl("REVOCATION_TTL_FLOOR_SECONDS", self.revocation_ttl_floor_seconds)
    }

    /// Minimum lifetime of a revocation record.
    pub fn revocation_ttl_floor(&self) -> Duration {
        Duration::from_secs(self.revocation_ttl_floor_seconds as u64)
    }

    /// Budget for a single event publish attempt.
    pub fn event_publish_timeout(&self) -> Duration {
        Duration::from_millis(self.events.publish_timeout_ms)
    }
}

fn check_ttl(var: &'static str, seconds: i64) -> Result<(), ConfigError> {
    if seconds <= 0 {
        return Err(ConfigError::Invalid {
            var,
            reason: "must be positive".to_string(),
        });
    }
    if seconds > MAX_TOKEN_TTL_SECONDS {
        return Err(ConfigError::Invalid {
            var,
            reason: format!("must be at most {} seconds", MAX_TOKEN_TTL_SECONDS),
        });
    }
    Ok(())
}

fn parse_var<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AuthServiceConfig {
        AuthServiceConfig {
            jwt: JwtConfig {
                secret: "x".repeat(MIN_JWT_SECRET_LENGTH),
                ..JwtConfig::default()
            },
            ..AuthServiceConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = valid();
        assert!(config.validate().is_ok());
        assert_eq!(config.jwt.access_ttl_seconds, 3600);
        assert_eq!(config.jwt.refresh_ttl_seconds, 7 * 24 * 3600);
        assert_eq!(config.revocation, RevocationPolicy::default());
        assert_eq!(config.revocation.on_validate_access, FailMode::Closed);
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut config = valid();
        config.jwt.secret = "short".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { var: "JWT_SECRET", .. })
        ));
    }

    #[test]
    fn test_non_positive_ttls_rejected() {
        let mut config = valid();
        config.jwt.access_ttl_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.revocation_ttl_floor_seconds = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_ttls_rejected() {
        let mut config = valid();
        config.jwt.access_ttl_seconds = i64::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { var: "JWT_ACCESS_TTL_SECONDS", .. })
        ));

        let mut config = valid();
        config.jwt.refresh_ttl_seconds = MAX_TOKEN_TTL_SECONDS + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { var: "JWT_REFRESH_TTL_SECONDS", .. })
        ));

        let mut config = valid();
        config.jwt.refresh_ttl_seconds = MAX_TOKEN_TTL_SECONDS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fail_mode_parsing() {
        assert_eq!("open".parse::<FailMode>(), Ok(FailMode::Open));
        assert_eq!(" Closed ".parse::<FailMode>(), Ok(FailMode::Closed));
        assert!("sometimes".parse::<FailMode>().is_err());
    }
}
