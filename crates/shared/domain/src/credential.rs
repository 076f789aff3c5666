//! Credential value object and its format/strength rules.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{EMAIL_PATTERN, MIN_PASSWORD_LENGTH};
use crate::error::{DomainError, DomainResult};

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(EMAIL_PATTERN).expect("EMAIL_PATTERN is a valid regex"));

/// Email and plaintext password pair accepted for registration.
///
/// Lives only for the duration of a registration request and is never persisted.
#[derive(Clone)]
pub struct Credential {
    email: String,
    password: String,
}

// Keep the plaintext out of logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Credential {
    /// Validate an email/password pair.
    ///
    /// Rules are checked in a fixed order and the first failure wins:
    /// email present and well-formed, password present, password length,
    /// then presence of an uppercase letter, a lowercase letter and a digit.
    pub fn new(email: &str, password: &str) -> DomainResult<Self> {
        let email = canonical_email(email);
        validate_email(&email)?;
        validate_password(password)?;

        Ok(Self {
            email,
            password: password.to_string(),
        })
    }

    /// Canonical (trimmed, lowercased) email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Plaintext password.
    pub fn password(&self) -> &str {
        &self.password
    }
}

/// Normalise an email address for storage and lookup.
pub fn canonical_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Check that an email is non-empty and matches the address pattern.
pub fn validate_email(email: &str) -> DomainResult<()> {
    if email.is_empty() || !EMAIL_REGEX.is_match(email) {
        return Err(DomainError::InvalidEmail);
    }
    Ok(())
}

/// Check password presence, length and character classes.
pub fn validate_password(password: &str) -> DomainResult<()> {
    if password.is_empty() {
        return Err(DomainError::InvalidPassword);
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(DomainError::PasswordTooShort(MIN_PASSWORD_LENGTH));
    }

    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !(has_upper && has_lower && has_digit) {
        return Err(DomainError::PasswordTooWeak);
    }

    Ok(())
}
