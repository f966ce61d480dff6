use async_trait::async_trait;
use jiff::Timestamp;
use pixelmint_core::{StoreError, UserId};
use serde::{Deserialize, Serialize};

/// A user's token account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Chat-platform user id
    pub user_id: UserId,
    /// Current token balance
    pub tokens: u64,
    /// Blocked accounts may not generate
    pub is_blocked: bool,
    /// Hourly generation cap enforced by the rate limiter (`None` = uncapped)
    pub hourly_limit: Option<u32>,
    /// When the account was first seen
    pub created_at: Timestamp,
    /// Last ledger mutation or contact
    pub last_seen_at: Option<Timestamp>,
}

/// Fields used to create an account on first contact
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Chat-platform user id
    pub user_id: UserId,
    /// Balance granted when the account is created
    pub starting_tokens: u64,
    /// Hourly generation cap (`None` = uncapped)
    pub hourly_limit: Option<u32>,
}

/// Outcome of a conditional debit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Debit {
    /// The full amount was removed; carries the new balance
    Applied(u64),
    /// Balance was below the amount and nothing changed; carries the balance
    Insufficient(u64),
}

/// Durable account storage with an atomic clamped balance update
///
/// Implementations must apply `add_tokens` as a single read-modify-write
/// so concurrent updates to the same account are linearizable.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fetch an account
    async fn get(&self, user_id: UserId) -> Result<Option<Account>, StoreError>;

    /// Create the account if it does not exist, otherwise refresh `last_seen_at`
    ///
    /// An existing balance is never reset.
    async fn upsert(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Atomically set `tokens = max(tokens + delta, 0)` and stamp `last_seen_at`
    ///
    /// Returns the new balance, or 0 when the account does not exist.
    async fn add_tokens(&self, user_id: UserId, delta: i64) -> Result<u64, StoreError>;

    /// Atomically remove `amount` only if the balance covers it
    ///
    /// Unknown accounts report `Insufficient(0)`.
    async fn debit(&self, user_id: UserId, amount: u64) -> Result<Debit, StoreError>;

    /// Set or clear the blocked flag
    async fn set_blocked(&self, user_id: UserId, blocked: bool) -> Result<(), StoreError>;
}

/// Apply a signed delta to a balance, flooring at zero
pub(crate) fn apply_delta(balance: u64, delta: i64) -> u64 {
    if delta >= 0 {
        balance.saturating_add(delta.unsigned_abs())
    } else {
        balance.saturating_sub(delta.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_floors_at_zero() {
        assert_eq!(apply_delta(3, -5), 0);
        assert_eq!(apply_delta(10, -5), 5);
        assert_eq!(apply_delta(0, 7), 7);
        assert_eq!(apply_delta(u64::MAX, 1), u64::MAX);
        assert_eq!(apply_delta(5, i64::MIN), 0);
    }
}
