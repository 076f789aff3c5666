//! Repository layer for account persistence.

pub mod entities;
mod account_repository;
mod memory;

pub use account_repository::{AccountRepository, AccountStore};
pub use memory::InMemoryAccountRepository;

#[cfg(any(test, feature = "test-utils"))]
pub use account_repository::MockAccountRepository;
