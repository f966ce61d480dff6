use serde::Deserialize;
use url::Url;

/// Persistence backend shared by the ledger, invoice and generation stores
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    /// In-process maps (single instance, lost on restart)
    #[default]
    Memory,
    /// Redis-backed storage (durable, shared between instances)
    Redis(RedisConfig),
}

/// Redis connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: Url,
}
