use std::sync::Arc;

use pixelmint_core::UserId;

use crate::account::{AccountStore, Debit};
use crate::error::LedgerError;

/// Token balance operations over an [`AccountStore`]
///
/// `spend` clamps at zero instead of rejecting an overdraft. Callers that
/// must not undercharge use `try_spend`, which removes all or nothing.
#[derive(Clone)]
pub struct TokenLedger {
    store: Arc<dyn AccountStore>,
}

impl TokenLedger {
    /// Create a ledger over the given store
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Underlying account store
    pub fn accounts(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    /// Current balance, 0 for unknown accounts
    pub async fn balance(&self, user_id: UserId) -> Result<u64, LedgerError> {
        let account = self.store.get(user_id).await?;
        Ok(account.map_or(0, |a| a.tokens))
    }

    /// Subtract `amount`, flooring at zero, and return the new balance
    pub async fn spend(&self, user_id: UserId, amount: u64) -> Result<u64, LedgerError> {
        let delta = to_delta(amount)?;
        let balance = self.store.add_tokens(user_id, -delta).await?;

        tracing::debug!(user_id, amount, balance, "tokens spent");

        Ok(balance)
    }

    /// Subtract `amount` only if the balance covers it
    pub async fn try_spend(&self, user_id: UserId, amount: u64) -> Result<Debit, LedgerError> {
        to_delta(amount)?;
        let debit = self.store.debit(user_id, amount).await?;

        tracing::debug!(user_id, amount, ?debit, "tokens debited");

        Ok(debit)
    }

    /// Add `amount` and return the new balance
    pub async fn add(&self, user_id: UserId, amount: u64) -> Result<u64, LedgerError> {
        let delta = to_delta(amount)?;
        let balance = self.store.add_tokens(user_id, delta).await?;

        tracing::debug!(user_id, amount, balance, "tokens added");

        Ok(balance)
    }
}

impl std::fmt::Debug for TokenLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenLedger").finish_non_exhaustive()
    }
}

fn to_delta(amount: u64) -> Result<i64, LedgerError> {
    i64::try_from(amount).map_err(|_| LedgerError::AmountOutOfRange(amount))
}
