//! Wires the core components the way the binary does, on memory stores

use std::sync::Arc;

use pixelmint_config::Config;
use pixelmint_core::UserId;
use pixelmint_imagegen::GenerationClient;
use pixelmint_ledger::{AccountStore, MemoryAccountStore, NewAccount, TokenLedger};
use pixelmint_payments::{CryptoPayClient, MemoryInvoiceStore, PackageCatalog, PaymentReconciler};
use pixelmint_studio::{FsImageStorage, MemoryGenerationStore, Studio};

pub struct TestApp {
    pub config: Config,
    pub ledger: TokenLedger,
    pub invoices: Arc<MemoryInvoiceStore>,
    pub reconciler: Arc<PaymentReconciler>,
    pub studio: Studio,
}

impl TestApp {
    pub fn new(config: Config) -> Self {
        let ledger = TokenLedger::new(Arc::new(MemoryAccountStore::new()));
        let invoices = Arc::new(MemoryInvoiceStore::new());

        let provider = CryptoPayClient::from_config(&config.payments).expect("crypto pay client");
        let reconciler = Arc::new(PaymentReconciler::new(
            Arc::new(provider),
            invoices.clone(),
            ledger.clone(),
            PackageCatalog::from_config(&config.payments),
        ));

        let generator = GenerationClient::from_config(&config.generation).expect("generation client");
        let studio = Studio::new(
            ledger.clone(),
            Arc::new(generator),
            Arc::new(MemoryGenerationStore::new()),
            Arc::new(FsImageStorage::new(&config.images.output_dir)),
        );

        Self {
            config,
            ledger,
            invoices,
            reconciler,
            studio,
        }
    }

    /// Register a user with the given balance
    pub async fn user(&self, user_id: UserId, tokens: u64) {
        self.ledger
            .accounts()
            .upsert(NewAccount {
                user_id,
                starting_tokens: tokens,
                hourly_limit: None,
            })
            .await
            .expect("account");
    }
}
