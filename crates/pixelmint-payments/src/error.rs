use pixelmint_core::{InvoiceId, StoreError, UserFacing};
use pixelmint_ledger::LedgerError;

/// Errors returned by the Crypto Pay client
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport or connection error
    #[error("payment provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Crypto Pay returned a non-success status or `ok: false`
    #[error("payment provider API error ({status}): {message}")]
    Api {
        /// HTTP status, or the error code from the response envelope
        status: u16,
        /// Error name or body from the response
        message: String,
    },

    /// Endpoint URL could not be built
    #[error("invalid payment provider URL: {0}")]
    InvalidUrl(String),
}

/// Errors returned by invoice creation and reconciliation
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The provider could not be reached or does not know the invoice
    #[error("payment provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Neither a local record nor the invoice payload says how many tokens to credit
    #[error("cannot determine tokens to credit for invoice {invoice_id}")]
    UnresolvableCredit {
        /// Invoice being reconciled
        invoice_id: InvoiceId,
    },

    /// Package code is not in the catalogue
    #[error("unknown package: {0}")]
    UnknownPackage(String),

    /// Invoice store failure
    #[error("invoice store error: {0}")]
    Store(#[from] StoreError),

    /// Ledger failure while crediting
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<ProviderError> for PaymentError {
    fn from(err: ProviderError) -> Self {
        Self::ProviderUnavailable(err.to_string())
    }
}

impl UserFacing for PaymentError {
    fn error_kind(&self) -> &str {
        match self {
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::UnresolvableCredit { .. } => "unresolvable_credit",
            Self::UnknownPackage(_) => "unknown_package",
            Self::Store(_) | Self::Ledger(_) => "internal_error",
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::ProviderUnavailable(_) => "Could not check the payment right now, please try again".to_owned(),
            Self::UnresolvableCredit { invoice_id } => {
                format!("Could not determine the package for invoice {invoice_id}, please contact support")
            }
            Self::UnknownPackage(code) => format!("Package '{code}' was not found"),
            Self::Store(_) | Self::Ledger(_) => "Something went wrong, please contact support".to_owned(),
        }
    }
}
