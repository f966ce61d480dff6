use pixelmint_core::{StoreError, UserFacing};

/// Errors returned by the token ledger
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The account store failed
    #[error("account store error: {0}")]
    Store(#[from] StoreError),

    /// Amount does not fit in a signed balance delta
    #[error("token amount out of range: {0}")]
    AmountOutOfRange(u64),
}

impl UserFacing for LedgerError {
    fn error_kind(&self) -> &str {
        match self {
            Self::Store(_) => "ledger_unavailable",
            Self::AmountOutOfRange(_) => "invalid_amount",
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::Store(_) => "Balance is temporarily unavailable, please try again later".to_owned(),
            Self::AmountOutOfRange(amount) => format!("{amount} tokens is not a valid amount"),
        }
    }
}
