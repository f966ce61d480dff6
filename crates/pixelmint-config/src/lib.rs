#![allow(clippy::must_use_candidate)]

mod env;
pub mod generation;
pub mod images;
pub mod ledger;
mod loader;
pub mod payments;
pub mod storage;
pub mod telemetry;

use serde::Deserialize;

pub use generation::*;
pub use images::*;
pub use ledger::*;
pub use payments::*;
pub use storage::*;
pub use telemetry::*;

/// Top-level pixelmint configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Persistence backend for accounts, invoices and generation records
    #[serde(default)]
    pub storage: StorageConfig,
    /// Token ledger pricing
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Upstream image model configuration
    pub generation: GenerationConfig,
    /// Crypto Pay configuration and package catalogue
    pub payments: PaymentsConfig,
    /// Generated image storage
    #[serde(default)]
    pub images: ImagesConfig,
}
