use async_trait::async_trait;
use dashmap::DashMap;
use jiff::Timestamp;
use pixelmint_core::{StoreError, UserId};

use crate::account::{Account, AccountStore, Debit, NewAccount, apply_delta};

/// In-memory account store
///
/// Each balance update runs while holding the map's shard lock for that
/// account, which makes `add_tokens` atomic within the process.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: DashMap<UserId, Account>,
}

impl MemoryAccountStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get(&self, user_id: UserId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(&user_id).map(|a| a.value().clone()))
    }

    async fn upsert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let now = Timestamp::now();
        let entry = self
            .accounts
            .entry(account.user_id)
            .and_modify(|existing| existing.last_seen_at = Some(now))
            .or_insert_with(|| Account {
                user_id: account.user_id,
                tokens: account.starting_tokens,
                is_blocked: false,
                hourly_limit: account.hourly_limit,
                created_at: now,
                last_seen_at: Some(now),
            });

        Ok(entry.value().clone())
    }

    async fn add_tokens(&self, user_id: UserId, delta: i64) -> Result<u64, StoreError> {
        let Some(mut account) = self.accounts.get_mut(&user_id) else {
            return Ok(0);
        };

        account.tokens = apply_delta(account.tokens, delta);
        account.last_seen_at = Some(Timestamp::now());

        Ok(account.tokens)
    }

    async fn debit(&self, user_id: UserId, amount: u64) -> Result<Debit, StoreError> {
        let Some(mut account) = self.accounts.get_mut(&user_id) else {
            return Ok(Debit::Insufficient(0));
        };

        if account.tokens < amount {
            return Ok(Debit::Insufficient(account.tokens));
        }

        account.tokens -= amount;
        account.last_seen_at = Some(Timestamp::now());

        Ok(Debit::Applied(account.tokens))
    }

    async fn set_blocked(&self, user_id: UserId, blocked: bool) -> Result<(), StoreError> {
        let mut account = self
            .accounts
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("account {user_id}")))?;
        account.is_blocked = blocked;
        Ok(())
    }
}
