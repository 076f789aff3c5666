//! Password value object - Domain layer password handling.
//!
//! Hashes with Argon2id using the crate defaults (m=19456 KiB, t=2, p=1) and a
//! fresh random salt per call, so hashing the same input twice yields different
//! PHC strings. Argon2 accepts inputs up to 2^32 - 1 bytes and never truncates,
//! so unlike bcrypt there is no 72-byte cut-off to guard against.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{DomainError, DomainResult};

/// Password value object that handles hashing and verification.
#[derive(Clone)]
pub struct Password {
    hash: String,
}

// Don't expose hash in debug output (security)
impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

impl Password {
    /// Hash a plaintext password with a random salt.
    ///
    /// Strength rules are not applied here; see [`crate::credential`].
    pub fn hash(plain_text: &str) -> DomainResult<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Self::argon2()
            .hash_password(plain_text.as_bytes(), &salt)
            .map_err(|e| DomainError::hashing(format!("Password hash failed: {}", e)))?;
        Ok(Self {
            hash: hash.to_string(),
        })
    }

    /// Create a Password from an existing hash (from database).
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    /// Get the hash string for storage.
    pub fn as_str(&self) -> &str {
        &self.hash
    }

    /// Consume and return the hash string.
    pub fn into_string(self) -> String {
        self.hash
    }

    /// Verify a plaintext password against this hash.
    ///
    /// A mismatch is `Ok(false)`; only a malformed stored hash is an error.
    pub fn verify(&self, plain_text: &str) -> DomainResult<bool> {
        let parsed = PasswordHash::new(&self.hash)
            .map_err(|e| DomainError::hashing(format!("Invalid hash format: {}", e)))?;
        Ok(Self::argon2()
            .verify_password(plain_text.as_bytes(), &parsed)
            .is_ok())
    }

    #[inline]
    fn argon2() -> Argon2<'static> {
        Argon2::default()
    }
}

impl From<Password> for String {
    fn from(password: Password) -> Self {
        password.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify() {
        let plain = "SecurePassword123!";
        let password = Password::hash(plain).unwrap();

        assert!(password.verify(plain).unwrap());
        assert!(!password.verify("WrongPassword123").unwrap());
    }

    #[test]
    fn test_password_from_hash() {
        let plain = "TestPassword123";
        let hash = Password::hash(plain).unwrap().into_string();

        let restored = Password::from_hash(hash);
        assert!(restored.verify(plain).unwrap());
    }

    #[test]
    fn test_same_password_different_salts() {
        let plain = "SamePassword123";
        let pass1 = Password::hash(plain).unwrap();
        let pass2 = Password::hash(plain).unwrap();

        // Different salts produce different hashes
        assert_ne!(pass1.as_str(), pass2.as_str());
        // But both verify correctly
        assert!(pass1.verify(plain).unwrap());
        assert!(pass2.verify(plain).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_error() {
        let password = Password::from_hash("not-a-phc-string");
        assert!(matches!(
            password.verify("anything"),
            Err(DomainError::Hashing(_))
        ));
    }

    #[test]
    fn test_debug_redacts_hash() {
        let password = Password::hash("Passw0rd1").unwrap();
        assert!(!format!("{:?}", password).contains(password.as_str()));
    }
}
