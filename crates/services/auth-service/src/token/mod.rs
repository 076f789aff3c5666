//! Token issuance and verification.
//!
//! Tokens are compact HS256 JWTs. Access and refresh tokens share one claim
//! layout and differ by the `token_type` claim, which the validator checks
//! against the entry point it was called from.

mod manager;

pub use manager::{Claims, TokenManager};
