use std::sync::Arc;

use pixelmint_config::{Config, LedgerConfig, StorageConfig};
use pixelmint_core::UserId;
use pixelmint_imagegen::GenerationClient;
use pixelmint_ledger::{
    Account, AccountStore, MemoryAccountStore, NewAccount, RedisAccountStore, TokenLedger,
};
use pixelmint_payments::{
    CryptoPayClient, InvoiceStore, MemoryInvoiceStore, PackageCatalog, PaymentReconciler,
    RedisInvoiceStore,
};
use pixelmint_studio::{
    FsImageStorage, GenerationStore, MemoryGenerationStore, RedisGenerationStore, Studio,
};

/// Core components, built once from configuration
pub struct App {
    pub ledger: TokenLedger,
    pub reconciler: PaymentReconciler,
    pub studio: Studio,
    onboarding: LedgerConfig,
}

impl App {
    pub async fn build(config: &Config) -> anyhow::Result<Self> {
        let (accounts, invoices, records): (
            Arc<dyn AccountStore>,
            Arc<dyn InvoiceStore>,
            Arc<dyn GenerationStore>,
        ) = match &config.storage {
            StorageConfig::Memory => {
                tracing::warn!("using in-memory storage, state is lost on exit");
                (
                    Arc::new(MemoryAccountStore::new()),
                    Arc::new(MemoryInvoiceStore::new()),
                    Arc::new(MemoryGenerationStore::new()),
                )
            }
            StorageConfig::Redis(redis) => {
                let conn = pixelmint_core::store::connect(redis.url.as_str()).await?;
                tracing::debug!(url = %redis.url, "connected to redis");
                (
                    Arc::new(RedisAccountStore::new(conn.clone())),
                    Arc::new(RedisInvoiceStore::new(conn.clone())),
                    Arc::new(RedisGenerationStore::new(conn)),
                )
            }
        };

        let ledger = TokenLedger::new(accounts);

        let provider = CryptoPayClient::from_config(&config.payments)?;
        let reconciler = PaymentReconciler::new(
            Arc::new(provider),
            invoices,
            ledger.clone(),
            PackageCatalog::from_config(&config.payments),
        );

        let generator = GenerationClient::from_config(&config.generation)?;
        let studio = Studio::new(
            ledger.clone(),
            Arc::new(generator),
            records,
            Arc::new(FsImageStorage::new(&config.images.output_dir)),
        );

        Ok(Self {
            ledger,
            reconciler,
            studio,
            onboarding: config.ledger.clone(),
        })
    }

    /// Create the account on first contact
    pub async fn onboard(&self, user_id: UserId) -> anyhow::Result<Account> {
        let account = self
            .ledger
            .accounts()
            .upsert(NewAccount {
                user_id,
                starting_tokens: self.onboarding.starting_tokens,
                hourly_limit: (self.onboarding.hourly_limit > 0)
                    .then_some(self.onboarding.hourly_limit),
            })
            .await?;
        Ok(account)
    }

    pub fn prompt_cost(&self) -> u64 {
        self.onboarding.cost_per_prompt
    }

    pub fn photosession_cost(&self) -> u64 {
        self.onboarding.cost_per_session
    }
}
