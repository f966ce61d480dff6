use pixelmint_core::{StoreError, UserFacing};
use pixelmint_ledger::LedgerError;

/// Errors returned by the generation orchestrator
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    /// The account is blocked
    #[error("account is blocked")]
    Blocked,

    /// Balance is below the generation cost; nothing was charged
    #[error("insufficient balance: need {required}, have {available}")]
    InsufficientBalance {
        /// Generation cost
        required: u64,
        /// Current balance
        available: u64,
    },

    /// Generation or image storage failed; the cost was refunded
    #[error("generation failed: {message}")]
    GenerationFailed {
        /// Upstream or storage message
        message: String,
    },

    /// Ledger failure
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Generation record store failure
    #[error("generation store error: {0}")]
    Store(#[from] StoreError),
}

impl UserFacing for StudioError {
    fn error_kind(&self) -> &str {
        match self {
            Self::Blocked => "blocked",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::GenerationFailed { .. } => "generation_failed",
            Self::Ledger(_) | Self::Store(_) => "internal_error",
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::Blocked => "Your account is blocked".to_owned(),
            Self::InsufficientBalance { required, available } => {
                format!("Not enough tokens: {required} needed, you have {available}. Top up your balance in the profile.")
            }
            Self::GenerationFailed { message } => format!("Could not generate the image: {message}"),
            Self::Ledger(_) | Self::Store(_) => "Something went wrong, please try again later".to_owned(),
        }
    }
}
