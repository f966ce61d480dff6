use thiserror::Error;

/// Errors raised by the persistence collaborators (account, invoice and
/// generation-record stores)
#[derive(Debug, Error)]
pub enum StoreError {
    /// Redis connection or command failure
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A stored record could not be decoded
    #[error("corrupt record {key}: {message}")]
    Corrupt {
        /// Storage key of the offending record
        key: String,
        /// What failed to decode
        message: String,
    },

    /// The record the operation targets does not exist
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Errors that the excluded chat layer renders to end users
///
/// Each domain crate implements this for its error type so the chat layer
/// stays decoupled from the internals of the ledger, payment and generation
/// crates.
pub trait UserFacing: std::error::Error {
    /// Machine-readable error kind (e.g. `insufficient_balance`)
    fn error_kind(&self) -> &str;

    /// Message safe to show to the user
    fn user_message(&self) -> String;
}
