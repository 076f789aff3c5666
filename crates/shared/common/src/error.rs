//! Unified error handling for the token lifecycle.
//!
//! Every operation returns a typed error kind. Mapping kinds onto HTTP or gRPC
//! status codes is the transport layer's job and does not happen here.

use domain::DomainError;
use thiserror::Error;

/// Error category, used by callers to decide on reporting and retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; report verbatim, never retry
    Validation,
    /// Uniqueness or state conflict; never retried automatically
    Conflict,
    /// Authentication/authorization refusal
    Auth,
    /// Referenced account does not exist
    NotFound,
    /// A backing store could not be reached
    Infrastructure,
    /// Bug or unexpected state
    Internal,
}

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Validation
    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Password too short (min {0} characters)")]
    PasswordTooShort(usize),

    #[error("Password too weak")]
    PasswordTooWeak,

    // Conflict
    #[error("Account already exists")]
    AccountAlreadyExists,

    #[error("Account is already blocked")]
    AlreadyBlocked,

    #[error("Account was modified concurrently")]
    ConcurrentModification,

    // Authentication
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Account is blocked")]
    AccountBlocked,

    #[error("Token is invalid")]
    TokenInvalid,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    TokenRevoked,

    // Resource errors
    #[error("User not found")]
    UserNotFound,

    // Infrastructure
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    // Internal
    #[error("Internal error")]
    Internal(String),
}

impl AppError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidEmail
            | AppError::InvalidPassword
            | AppError::PasswordTooShort(_)
            | AppError::PasswordTooWeak => ErrorKind::Validation,
            AppError::AccountAlreadyExists
            | AppError::AlreadyBlocked
            | AppError::ConcurrentModification => ErrorKind::Conflict,
            AppError::InvalidCredentials
            | AppError::AccountInactive
            | AppError::AccountBlocked
            | AppError::TokenInvalid
            | AppError::TokenExpired
            | AppError::TokenRevoked => ErrorKind::Auth,
            AppError::UserNotFound => ErrorKind::NotFound,
            AppError::StoreUnavailable(_) => ErrorKind::Infrastructure,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidEmail => "INVALID_EMAIL",
            AppError::InvalidPassword => "INVALID_PASSWORD",
            AppError::PasswordTooShort(_) => "PASSWORD_TOO_SHORT",
            AppError::PasswordTooWeak => "PASSWORD_TOO_WEAK",
            AppError::AccountAlreadyExists => "ACCOUNT_ALREADY_EXISTS",
            AppError::AlreadyBlocked => "ALREADY_BLOCKED",
            AppError::ConcurrentModification => "CONCURRENT_MODIFICATION",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::AccountInactive => "ACCOUNT_INACTIVE",
            AppError::AccountBlocked => "ACCOUNT_BLOCKED",
            AppError::TokenInvalid => "TOKEN_INVALID",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::TokenRevoked => "TOKEN_REVOKED",
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::StoreUnavailable(detail) => {
                tracing::error!("Store unavailable: {}", detail);
                "A backing service is unavailable".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Whether a caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::ConcurrentModification) || self.kind() == ErrorKind::Infrastructure
    }
}

// =============================================================================
// Infrastructure Error Conversion
// =============================================================================

#[cfg(feature = "database")]
impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::StoreUnavailable(format!("database: {}", err))
    }
}

#[cfg(feature = "cache")]
impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::StoreUnavailable(format!("redis: {}", err))
    }
}

#[cfg(feature = "jwt")]
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::TokenInvalid,
        }
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidEmail => AppError::InvalidEmail,
            DomainError::InvalidPassword => AppError::InvalidPassword,
            DomainError::PasswordTooShort(min) => AppError::PasswordTooShort(min),
            DomainError::PasswordTooWeak => AppError::PasswordTooWeak,
            DomainError::AlreadyBlocked => AppError::AlreadyBlocked,
            DomainError::EmptyPasswordHash => AppError::internal("Password hash must not be empty"),
            DomainError::Hashing(msg) => AppError::Internal(msg),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_user_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_user_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::UserNotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn store_unavailable(detail: impl Into<String>) -> Self {
        AppError::StoreUnavailable(detail.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_validation() {
        let err: AppError = DomainError::PasswordTooWeak.into();
        assert!(matches!(err, AppError::PasswordTooWeak));
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err: AppError = DomainError::PasswordTooShort(8).into();
        assert_eq!(err.code(), "PASSWORD_TOO_SHORT");
    }

    #[test]
    fn test_hashing_error_is_internal() {
        let err: AppError = DomainError::hashing("bad phc").into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.user_message(), "An internal error occurred");
    }

    #[test]
    fn test_infrastructure_detail_hidden() {
        let err = AppError::store_unavailable("redis: connection refused");
        assert!(err.is_retryable());
        assert!(!err.user_message().contains("connection refused"));
    }

    #[test]
    fn test_invalid_credentials_message_is_generic() {
        assert_eq!(
            AppError::InvalidCredentials.user_message(),
            "Invalid email or password"
        );
        assert_eq!(AppError::InvalidCredentials.kind(), ErrorKind::Auth);
    }

    #[test]
    fn test_concurrent_modification_is_retryable_conflict() {
        let err = AppError::ConcurrentModification;
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.code(), "CONCURRENT_MODIFICATION");
        assert!(err.is_retryable());
        assert!(!AppError::AccountAlreadyExists.is_retryable());
    }

    #[test]
    fn test_option_ext() {
        let missing: Option<u8> = None;
        assert!(matches!(
            missing.ok_or_user_not_found(),
            Err(AppError::UserNotFound)
        ));
    }
}
