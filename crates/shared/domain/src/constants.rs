//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// Validation
// =============================================================================

/// Minimum password length requirement
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Email address pattern accepted for account identities
pub const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$";

// =============================================================================
// Authentication
// =============================================================================

/// Default access token lifetime in seconds
pub const DEFAULT_ACCESS_TTL_SECONDS: i64 = 3600;

/// Default refresh token lifetime in seconds (7 days)
pub const DEFAULT_REFRESH_TTL_SECONDS: i64 = 7 * 24 * 3600;

/// Upper bound on configured token and revocation lifetimes in seconds (10 years)
pub const MAX_TOKEN_TTL_SECONDS: i64 = 10 * 365 * 24 * 3600;

/// Default `iss` claim stamped on every token
pub const DEFAULT_TOKEN_ISSUER: &str = "auth-service";

/// Minimum JWT secret length (security requirement)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// JWT token type identifier
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

// =============================================================================
// Revocation
// =============================================================================

/// Key prefix for revocation records
pub const REVOCATION_KEY_PREFIX: &str = "blacklist:";

/// Marker value stored under a revocation key
pub const REVOCATION_MARKER: &str = "revoked";

/// Default minimum lifetime of a revocation record, in seconds
pub const DEFAULT_REVOCATION_TTL_FLOOR_SECONDS: i64 = 5;

// =============================================================================
// Events
// =============================================================================

pub const EVENT_ACCOUNT_REGISTERED: &str = "user.registered";
pub const EVENT_ACCOUNT_LOGGED_IN: &str = "user.logged_in";
pub const EVENT_ACCOUNT_LOGGED_OUT: &str = "user.logged_out";
pub const EVENT_ACCOUNT_BLOCKED: &str = "user.blocked";
pub const EVENT_ACCOUNT_ACTIVATED: &str = "user.activated";
pub const EVENT_PASSWORD_CHANGED: &str = "user.password_changed";

/// Default Redis stream that receives domain events
pub const DEFAULT_EVENT_STREAM_KEY: &str = "auth.events";

/// Default budget for a single publish attempt, in milliseconds
pub const DEFAULT_EVENT_PUBLISH_TIMEOUT_MS: u64 = 250;
