use async_trait::async_trait;
use jiff::Timestamp;
use pixelmint_core::InvoiceId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Request to issue a new invoice
#[derive(Debug, Clone, Serialize)]
pub struct CreateInvoice {
    /// Asset code (e.g. USDT)
    pub asset: String,
    /// Amount in `asset`
    pub amount: Decimal,
    /// Shown to the payer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Opaque data returned with the invoice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

/// Invoice as reported by the payment provider
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderInvoice {
    /// Provider-assigned id
    pub invoice_id: InvoiceId,
    /// Raw provider status (`active`, `paid`, `expired`, ...)
    pub status: String,
    /// Asset code
    #[serde(default)]
    pub asset: Option<String>,
    /// Amount in `asset`
    pub amount: Decimal,
    /// Payment link
    #[serde(default, alias = "pay_url")]
    pub bot_invoice_url: Option<String>,
    /// Payload attached at creation
    #[serde(default)]
    pub payload: Option<String>,
    /// Payment time
    #[serde(default)]
    pub paid_at: Option<Timestamp>,
}

/// External payment provider
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Issue a new invoice
    async fn create_invoice(&self, request: &CreateInvoice) -> Result<ProviderInvoice, ProviderError>;

    /// Fetch an invoice; `None` if the provider does not know it
    async fn get_invoice(&self, invoice_id: InvoiceId) -> Result<Option<ProviderInvoice>, ProviderError>;
}
