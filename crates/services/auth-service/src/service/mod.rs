//! Token lifecycle business logic.

mod token_lifecycle;

pub use token_lifecycle::{LifecycleSettings, TokenLifecycle, TokenLifecycleService};
