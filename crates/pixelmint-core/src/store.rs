//! Redis helpers shared by the persistent stores

use std::collections::HashMap;
use std::str::FromStr;

use redis::aio::ConnectionManager;

use crate::StoreError;

/// Open a managed, auto-reconnecting connection
///
/// # Errors
///
/// Returns `StoreError::Redis` if the URL is invalid or the server is unreachable
pub async fn connect(url: &str) -> Result<ConnectionManager, StoreError> {
    let client = redis::Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;
    Ok(manager)
}

/// Build a namespaced key, e.g. `pixelmint:account:42`
pub fn key(kind: &str, id: impl std::fmt::Display) -> String {
    format!("{}:{kind}:{id}", crate::REDIS_KEY_PREFIX)
}

/// Decoded `HGETALL` reply
pub struct HashRecord<'a> {
    key: &'a str,
    fields: HashMap<String, String>,
}

impl<'a> HashRecord<'a> {
    /// Wrap a hash reply; `None` when the hash does not exist
    pub fn new(key: &'a str, fields: HashMap<String, String>) -> Option<Self> {
        (!fields.is_empty()).then_some(Self { key, fields })
    }

    /// Required field
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupt` if the field is missing or does not parse
    pub fn required<T>(&self, field: &str) -> Result<T, StoreError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(field)?.ok_or_else(|| StoreError::Corrupt {
            key: self.key.to_owned(),
            message: format!("missing field `{field}`"),
        })
    }

    /// Optional field; empty strings count as absent
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupt` if the field is present but does not parse
    pub fn optional<T>(&self, field: &str) -> Result<Option<T>, StoreError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.fields.get(field).map(String::as_str) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|e| StoreError::Corrupt {
                key: self.key.to_owned(),
                message: format!("field `{field}`: {e}"),
            }),
        }
    }

    /// Raw string field
    pub fn text(&self, field: &str) -> Option<String> {
        self.fields.get(field).filter(|v| !v.is_empty()).cloned()
    }

    /// Boolean field stored as `0`/`1`
    pub fn flag(&self, field: &str) -> bool {
        self.fields.get(field).is_some_and(|v| v == "1")
    }
}
