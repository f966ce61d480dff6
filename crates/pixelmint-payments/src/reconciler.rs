use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use pixelmint_core::{InvoiceId, UserId};
use pixelmint_ledger::TokenLedger;
use tokio::sync::Mutex;

use crate::catalog::{InvoicePayload, PackageCatalog};
use crate::error::PaymentError;
use crate::invoice::{CreditClaim, Invoice, InvoiceStatus, InvoiceStore, InvoiceUpsert};
use crate::provider::{CreateInvoice, PaymentProvider, ProviderInvoice};

/// Result of a single reconcile call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// This call applied the credit
    Credited {
        /// Tokens added
        tokens: u64,
        /// Balance after the credit
        balance: u64,
    },
    /// The invoice was credited earlier; nothing changed
    AlreadyCredited {
        /// Tokens added by the earlier credit
        tokens: u64,
        /// Current balance
        balance: u64,
    },
    /// Another reconcile holds the credit claim; nothing changed here
    InProgress {
        /// Tokens the invoice credits
        tokens: u64,
        /// Current balance
        balance: u64,
    },
    /// Not paid yet, or in a state that never credits
    Pending {
        /// Raw provider status
        status: String,
        /// Tokens the invoice will credit once paid
        tokens: u64,
        /// Current balance
        balance: u64,
    },
}

impl ReconcileOutcome {
    /// Whether this call credited the ledger
    pub const fn credited_now(&self) -> bool {
        matches!(self, Self::Credited { .. })
    }

    /// Balance observed by the call
    pub const fn balance(&self) -> u64 {
        match self {
            Self::Credited { balance, .. }
            | Self::AlreadyCredited { balance, .. }
            | Self::InProgress { balance, .. }
            | Self::Pending { balance, .. } => *balance,
        }
    }

    /// Tokens the invoice is worth
    pub const fn tokens(&self) -> u64 {
        match self {
            Self::Credited { tokens, .. }
            | Self::AlreadyCredited { tokens, .. }
            | Self::InProgress { tokens, .. }
            | Self::Pending { tokens, .. } => *tokens,
        }
    }
}

/// How long a credit claim survives a reconcile that never finishes
const CREDIT_LEASE: Duration = Duration::from_secs(60);

/// Creates invoices and credits paid ones to the ledger exactly once
///
/// Only the holder of the store's credit claim adds tokens, which covers
/// reconciles running in other processes. Reconciles of the same invoice in
/// this process are also serialised by a per-invoice async mutex, so they
/// wait for the holder and then observe `AlreadyCredited`.
pub struct PaymentReconciler {
    provider: Arc<dyn PaymentProvider>,
    invoices: Arc<dyn InvoiceStore>,
    ledger: TokenLedger,
    catalog: PackageCatalog,
    locks: DashMap<InvoiceId, Arc<Mutex<()>>>,
}

impl PaymentReconciler {
    /// Create a reconciler
    pub fn new(
        provider: Arc<dyn PaymentProvider>,
        invoices: Arc<dyn InvoiceStore>,
        ledger: TokenLedger,
        catalog: PackageCatalog,
    ) -> Self {
        Self {
            provider,
            invoices,
            ledger,
            catalog,
            locks: DashMap::new(),
        }
    }

    /// Package catalogue used for invoice creation
    pub fn catalog(&self) -> &PackageCatalog {
        &self.catalog
    }

    /// Issue an invoice for a package and store the local record
    pub async fn create_invoice(&self, user_id: UserId, package_code: &str) -> Result<Invoice, PaymentError> {
        let package = self
            .catalog
            .get(package_code)
            .ok_or_else(|| PaymentError::UnknownPackage(package_code.to_owned()))?;

        let payload = InvoicePayload {
            user_id,
            tokens: package.tokens,
            package: package.code.clone(),
        };

        let request = CreateInvoice {
            asset: self.catalog.asset().to_owned(),
            amount: self.catalog.crypto_price(package),
            description: Some(format!("{}: {} tokens", package.title, package.tokens)),
            payload: Some(payload.to_string()),
        };

        let remote = self.provider.create_invoice(&request).await?;

        tracing::info!(
            user_id,
            invoice_id = remote.invoice_id,
            package = %package.code,
            amount = %remote.amount,
            "invoice created"
        );

        let invoice = self
            .invoices
            .upsert(snapshot(&remote, user_id, package.tokens, &request.asset))
            .await?;

        Ok(invoice)
    }

    /// Merge the provider's view of an invoice and credit it if newly paid
    pub async fn reconcile(&self, invoice_id: InvoiceId, user_id: UserId) -> Result<ReconcileOutcome, PaymentError> {
        let remote = self
            .provider
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| PaymentError::ProviderUnavailable(format!("invoice {invoice_id} is unknown to the provider")))?;

        let lock = Arc::clone(self.locks.entry(invoice_id).or_default().value());
        let outcome = {
            let _guard = lock.lock().await;
            self.apply(remote, user_id).await
        };

        drop(lock);
        self.locks.remove_if(&invoice_id, |_, l| Arc::strong_count(l) == 1);

        outcome
    }

    async fn apply(&self, remote: ProviderInvoice, user_id: UserId) -> Result<ReconcileOutcome, PaymentError> {
        let invoice_id = remote.invoice_id;
        let local = self.invoices.get(invoice_id).await?;

        let tokens = match &local {
            Some(invoice) => invoice.tokens,
            None => remote
                .payload
                .as_deref()
                .and_then(InvoicePayload::tokens_from)
                .ok_or(PaymentError::UnresolvableCredit { invoice_id })?,
        };

        if let Some(invoice) = local.as_ref().filter(|i| i.user_id != user_id) {
            tracing::warn!(invoice_id, owner = invoice.user_id, user_id, "invoice checked by a different user");
        }

        let already_credited = local.as_ref().is_some_and(|i| i.status == InvoiceStatus::Credited);
        let asset = remote
            .asset
            .clone()
            .or_else(|| local.as_ref().map(|i| i.asset.clone()))
            .unwrap_or_default();

        let merged = self.invoices.upsert(snapshot(&remote, user_id, tokens, &asset)).await?;
        let tokens = merged.tokens;

        if InvoiceStatus::parse(&remote.status) != InvoiceStatus::Paid {
            tracing::debug!(invoice_id, status = %remote.status, "invoice not paid");
            return Ok(ReconcileOutcome::Pending {
                status: remote.status,
                tokens,
                balance: self.ledger.balance(user_id).await?,
            });
        }

        if already_credited {
            tracing::debug!(invoice_id, "invoice already credited");
            return Ok(ReconcileOutcome::AlreadyCredited {
                tokens,
                balance: self.ledger.balance(user_id).await?,
            });
        }

        match self.invoices.claim_credit(invoice_id, CREDIT_LEASE).await? {
            CreditClaim::Acquired => {}
            CreditClaim::Credited => {
                tracing::debug!(invoice_id, "invoice already credited");
                return Ok(ReconcileOutcome::AlreadyCredited {
                    tokens,
                    balance: self.ledger.balance(user_id).await?,
                });
            }
            CreditClaim::Held => {
                tracing::debug!(invoice_id, "invoice is being credited elsewhere");
                return Ok(ReconcileOutcome::InProgress {
                    tokens,
                    balance: self.ledger.balance(user_id).await?,
                });
            }
        }

        let balance = match self.ledger.add(user_id, tokens).await {
            Ok(balance) => balance,
            Err(err) => {
                if let Err(e) = self.invoices.release_credit(invoice_id).await {
                    tracing::warn!(invoice_id, error = %e, "failed to release credit claim");
                }
                return Err(err.into());
            }
        };

        match self.invoices.mark_credited(invoice_id).await? {
            Some(transition) if transition.transitioned => {}
            Some(_) => {
                tracing::error!(
                    invoice_id,
                    user_id,
                    tokens,
                    "credit claim lapsed and the invoice was credited elsewhere, reverting"
                );
                let balance = self.ledger.spend(user_id, tokens).await?;
                return Ok(ReconcileOutcome::AlreadyCredited { tokens, balance });
            }
            None => tracing::warn!(invoice_id, "invoice disappeared before it could be marked credited"),
        }

        tracing::info!(invoice_id, user_id, tokens, balance, "invoice credited");

        Ok(ReconcileOutcome::Credited { tokens, balance })
    }
}

impl std::fmt::Debug for PaymentReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentReconciler")
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

fn snapshot(remote: &ProviderInvoice, user_id: UserId, tokens: u64, asset: &str) -> InvoiceUpsert {
    InvoiceUpsert {
        invoice_id: remote.invoice_id,
        user_id,
        amount: remote.amount,
        asset: asset.to_owned(),
        tokens,
        status: InvoiceStatus::parse(&remote.status),
        invoice_url: remote.bot_invoice_url.clone(),
        payload: remote.payload.clone(),
        paid_at: remote.paid_at,
    }
}
