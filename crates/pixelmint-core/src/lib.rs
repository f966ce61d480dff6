#![allow(clippy::must_use_candidate)]

mod error;
pub mod store;

pub use error::{StoreError, UserFacing};

/// Chat-platform user identifier
pub type UserId = i64;

/// Provider-assigned invoice identifier
pub type InvoiceId = i64;

/// Key prefix shared by every Redis-backed store
pub const REDIS_KEY_PREFIX: &str = "pixelmint";
