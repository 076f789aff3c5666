//! Common utilities shared across services.
//!
//! This crate provides:
//! - Unified error handling with typed error kinds
//! - An injectable clock
//! - Configuration structures

pub mod clock;
pub mod config;
pub mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::*;
pub use error::{AppError, AppResult, ErrorKind, OptionExt};
