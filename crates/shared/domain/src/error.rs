//! Domain-level errors.
//!
//! These errors represent business rule violations and domain logic failures.
//! They are independent of infrastructure concerns (database, cache, event bus).

use thiserror::Error;

/// Domain-specific errors for business rule violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Email is empty or does not match the address pattern
    #[error("Invalid email format")]
    InvalidEmail,

    /// Password is empty
    #[error("Invalid password")]
    InvalidPassword,

    /// Password is shorter than the minimum length
    #[error("Password too short (min {0} characters)")]
    PasswordTooShort(usize),

    /// Password lacks an uppercase letter, a lowercase letter or a digit
    #[error("Password too weak")]
    PasswordTooWeak,

    /// Status transition attempted on a blocked account
    #[error("Account is already blocked")]
    AlreadyBlocked,

    /// A password hash was required but none was given
    #[error("Password hash must not be empty")]
    EmptyPasswordHash,

    /// Hash computation failed or a stored hash could not be parsed
    #[error("Password hashing error: {0}")]
    Hashing(String),
}

impl DomainError {
    /// Create a hashing error
    pub fn hashing(msg: impl Into<String>) -> Self {
        DomainError::Hashing(msg.into())
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
