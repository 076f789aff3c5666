//! Domain layer - Core business entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies:
//! the account aggregate, credential rules, password hashing, token values and
//! domain events.

pub mod account;
pub mod constants;
pub mod credential;
pub mod error;
pub mod events;
pub mod password;
pub mod token;

pub use account::{Account, AccountResponse, AccountStatus, Transition};
pub use constants::*;
pub use credential::Credential;
pub use error::{DomainError, DomainResult};
pub use events::{DomainEvent, EventKind};
pub use password::Password;
pub use token::{TokenPair, TokenType};
