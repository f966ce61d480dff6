use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use pixelmint_core::{InvoiceId, StoreError, UserId};
use rust_decimal::Decimal;

/// Invoice lifecycle state
///
/// `Active`, `Paid` and `Expired` are reported by the provider; `Credited`
/// is local and terminal. Anything else is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceStatus {
    /// Awaiting payment
    Active,
    /// Paid, tokens not yet credited
    Paid,
    /// Expired without payment
    Expired,
    /// Paid and credited to the ledger
    Credited,
    /// Any other provider status
    Other(String),
}

impl InvoiceStatus {
    /// Parse a status string, case-insensitively
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "paid" => Self::Paid,
            "expired" => Self::Expired,
            "credited" => Self::Credited,
            _ => Self::Other(raw.trim().to_owned()),
        }
    }

    /// Storage representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Paid => "paid",
            Self::Expired => "expired",
            Self::Credited => "credited",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Local record of a provider invoice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    /// Provider-assigned id
    pub invoice_id: InvoiceId,
    /// User the invoice was issued to
    pub user_id: UserId,
    /// Amount in `asset`
    pub amount: Decimal,
    /// Asset code (e.g. USDT)
    pub asset: String,
    /// Tokens credited once paid
    pub tokens: u64,
    /// Lifecycle state
    pub status: InvoiceStatus,
    /// Payment link
    pub invoice_url: Option<String>,
    /// Opaque payload attached at creation
    pub payload: Option<String>,
    /// First time the record was stored
    pub created_at: Timestamp,
    /// When the provider reported payment
    pub paid_at: Option<Timestamp>,
    /// When tokens were credited
    pub credited_at: Option<Timestamp>,
}

/// Provider snapshot merged into the local record
#[derive(Debug, Clone)]
pub struct InvoiceUpsert {
    /// Provider-assigned id
    pub invoice_id: InvoiceId,
    /// User the invoice belongs to (kept from the first insert)
    pub user_id: UserId,
    /// Amount in `asset`
    pub amount: Decimal,
    /// Asset code
    pub asset: String,
    /// Tokens to credit (kept from the first insert)
    pub tokens: u64,
    /// Status reported by the provider
    pub status: InvoiceStatus,
    /// Payment link, if known
    pub invoice_url: Option<String>,
    /// Payload, if known
    pub payload: Option<String>,
    /// Payment time, if known
    pub paid_at: Option<Timestamp>,
}

/// Result of [`InvoiceStore::mark_credited`]
#[derive(Debug, Clone)]
pub struct CreditTransition {
    /// Record after the call
    pub invoice: Invoice,
    /// Whether this call moved the invoice into `Credited`
    pub transitioned: bool,
}

/// Result of [`InvoiceStore::claim_credit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditClaim {
    /// The caller owns the credit and must add the tokens, then call
    /// `mark_credited` (or `release_credit` if the add failed)
    Acquired,
    /// Another caller holds an unexpired claim
    Held,
    /// The invoice is already credited
    Credited,
}

/// Durable invoice records
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Fetch an invoice
    async fn get(&self, invoice_id: InvoiceId) -> Result<Option<Invoice>, StoreError>;

    /// Insert or merge a provider snapshot (see [`merge`])
    async fn upsert(&self, upsert: InvoiceUpsert) -> Result<Invoice, StoreError>;

    /// Move the invoice to `Credited`, stamping `credited_at` (and `paid_at`
    /// if still unset). A no-op for an already credited invoice. `None` if
    /// the invoice does not exist.
    async fn mark_credited(&self, invoice_id: InvoiceId) -> Result<Option<CreditTransition>, StoreError>;

    /// Atomically take the right to credit an invoice
    ///
    /// At most one caller holds the claim at a time across every process
    /// sharing the store. The claim lapses after `lease`, so a caller that
    /// dies mid-credit leaves the invoice re-creditable. `mark_credited`
    /// clears it. Unknown invoices are `StoreError::NotFound`.
    async fn claim_credit(&self, invoice_id: InvoiceId, lease: Duration) -> Result<CreditClaim, StoreError>;

    /// Drop a claim without crediting
    async fn release_credit(&self, invoice_id: InvoiceId) -> Result<(), StoreError>;
}

/// Merge a provider snapshot into an existing record
///
/// The provider status replaces the local one unless the invoice is already
/// credited. `invoice_url`, `payload` and `paid_at` are only filled when
/// still unset; `user_id` and `tokens` never change after the first insert.
pub fn merge(existing: Option<Invoice>, upsert: InvoiceUpsert, now: Timestamp) -> Invoice {
    match existing {
        None => Invoice {
            invoice_id: upsert.invoice_id,
            user_id: upsert.user_id,
            amount: upsert.amount,
            asset: upsert.asset,
            tokens: upsert.tokens,
            status: upsert.status,
            invoice_url: upsert.invoice_url,
            payload: upsert.payload,
            created_at: now,
            paid_at: upsert.paid_at,
            credited_at: None,
        },
        Some(current) => Invoice {
            status: if current.status == InvoiceStatus::Credited {
                InvoiceStatus::Credited
            } else {
                upsert.status
            },
            amount: upsert.amount,
            asset: upsert.asset,
            invoice_url: current.invoice_url.or(upsert.invoice_url),
            payload: current.payload.or(upsert.payload),
            paid_at: current.paid_at.or(upsert.paid_at),
            ..current
        },
    }
}

/// Apply the `Credited` transition to a record
pub(crate) fn credit(invoice: &mut Invoice, now: Timestamp) -> bool {
    if invoice.status == InvoiceStatus::Credited {
        return false;
    }
    invoice.status = InvoiceStatus::Credited;
    invoice.credited_at = Some(now);
    invoice.paid_at.get_or_insert(now);
    true
}
