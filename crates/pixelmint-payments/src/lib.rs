#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod catalog;
pub mod client;
pub mod error;
pub mod invoice;
pub mod provider;
pub mod reconciler;
pub mod storage;

pub use catalog::{InvoicePayload, PackageCatalog};
pub use client::CryptoPayClient;
pub use error::{PaymentError, ProviderError};
pub use invoice::{CreditClaim, CreditTransition, Invoice, InvoiceStatus, InvoiceStore, InvoiceUpsert};
pub use provider::{CreateInvoice, PaymentProvider, ProviderInvoice};
pub use reconciler::{PaymentReconciler, ReconcileOutcome};
pub use storage::{memory::MemoryInvoiceStore, redis::RedisInvoiceStore};
