//! Revocation (blacklist) store.
//!
//! A keyed expiring store recording token identities that must be rejected
//! before their natural expiry. Records are never deleted explicitly; each one
//! lives exactly as long as the token it denies (bounded below by a floor).

mod memory;
mod redis_store;

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use common::AppResult;
use domain::REVOCATION_KEY_PREFIX;

pub use memory::InMemoryRevocationStore;
pub use redis_store::RedisRevocationStore;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Keyed expiring store of revoked token identities.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record `token_id` as revoked for `ttl`. Idempotent.
    async fn add(&self, token_id: &str, ttl: StdDuration) -> AppResult<()>;

    /// Whether `token_id` is currently revoked.
    ///
    /// Must observe an `add` made earlier by the same caller.
    async fn exists(&self, token_id: &str) -> AppResult<bool>;
}

/// Storage key for a token identity.
pub fn revocation_key(token_id: &str) -> String {
    format!("{}{}", REVOCATION_KEY_PREFIX, token_id)
}

/// Lifetime of a deny record: the token's remaining lifetime, never below `floor`.
///
/// A token already at or past expiry still gets a `floor`-long record so a
/// replay racing the expiry boundary is denied.
pub fn remaining_ttl(expires_at: DateTime<Utc>, now: DateTime<Utc>, floor: StdDuration) -> StdDuration {
    (expires_at - now)
        .to_std()
        .map(|remaining| remaining.max(floor))
        .unwrap_or(floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_revocation_key() {
        assert_eq!(revocation_key("abc"), "blacklist:abc");
    }

    #[test]
    fn test_remaining_ttl() {
        let now = Utc::now();
        let floor = StdDuration::from_secs(5);

        assert_eq!(
            remaining_ttl(now + Duration::seconds(3600), now, floor),
            StdDuration::from_secs(3600)
        );
        // Near expiry: floor wins
        assert_eq!(remaining_ttl(now + Duration::seconds(2), now, floor), floor);
        // At and past expiry: floor wins
        assert_eq!(remaining_ttl(now, now, floor), floor);
        assert_eq!(remaining_ttl(now - Duration::seconds(30), now, floor), floor);
    }
}
