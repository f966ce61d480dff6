use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use jiff::Timestamp;
use pixelmint_core::{InvoiceId, StoreError};

use crate::invoice::{
    CreditClaim, CreditTransition, Invoice, InvoiceStatus, InvoiceStore, InvoiceUpsert, credit, merge,
};

/// In-memory invoice store
///
/// Credit claims are kept next to the records as lease deadlines. The
/// invoice entry is always locked before the claim entry.
#[derive(Debug, Default)]
pub struct MemoryInvoiceStore {
    invoices: DashMap<InvoiceId, Invoice>,
    claims: DashMap<InvoiceId, Instant>,
}

impl MemoryInvoiceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceStore for MemoryInvoiceStore {
    async fn get(&self, invoice_id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
        Ok(self.invoices.get(&invoice_id).map(|i| i.value().clone()))
    }

    async fn upsert(&self, upsert: InvoiceUpsert) -> Result<Invoice, StoreError> {
        let now = Timestamp::now();
        let merged = match self.invoices.entry(upsert.invoice_id) {
            Entry::Occupied(mut entry) => {
                let merged = merge(Some(entry.get().clone()), upsert, now);
                entry.insert(merged.clone());
                merged
            }
            Entry::Vacant(entry) => entry.insert(merge(None, upsert, now)).value().clone(),
        };
        Ok(merged)
    }

    async fn mark_credited(&self, invoice_id: InvoiceId) -> Result<Option<CreditTransition>, StoreError> {
        let Some(mut invoice) = self.invoices.get_mut(&invoice_id) else {
            return Ok(None);
        };

        let transitioned = credit(invoice.value_mut(), Timestamp::now());
        self.claims.remove(&invoice_id);

        Ok(Some(CreditTransition {
            invoice: invoice.value().clone(),
            transitioned,
        }))
    }

    async fn claim_credit(&self, invoice_id: InvoiceId, lease: Duration) -> Result<CreditClaim, StoreError> {
        let invoice = self
            .invoices
            .get(&invoice_id)
            .ok_or_else(|| StoreError::NotFound(format!("invoice {invoice_id}")))?;

        if invoice.status == InvoiceStatus::Credited {
            return Ok(CreditClaim::Credited);
        }

        let now = Instant::now();
        let claim = match self.claims.entry(invoice_id) {
            Entry::Occupied(entry) if *entry.get() > now => CreditClaim::Held,
            Entry::Occupied(mut entry) => {
                entry.insert(now + lease);
                CreditClaim::Acquired
            }
            Entry::Vacant(entry) => {
                entry.insert(now + lease);
                CreditClaim::Acquired
            }
        };

        Ok(claim)
    }

    async fn release_credit(&self, invoice_id: InvoiceId) -> Result<(), StoreError> {
        self.claims.remove(&invoice_id);
        Ok(())
    }
}
