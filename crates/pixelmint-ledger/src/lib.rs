#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod account;
mod error;
mod ledger;
pub mod storage;

pub use account::{Account, AccountStore, Debit, NewAccount};
pub use error::LedgerError;
pub use ledger::TokenLedger;
pub use storage::{memory::MemoryAccountStore, redis::RedisAccountStore};
