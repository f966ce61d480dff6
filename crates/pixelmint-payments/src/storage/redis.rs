use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use pixelmint_core::store::{HashRecord, key};
use pixelmint_core::{InvoiceId, StoreError};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use crate::invoice::{CreditClaim, CreditTransition, Invoice, InvoiceStatus, InvoiceStore, InvoiceUpsert};

/// Merge a provider snapshot; `credited` is never overwritten and
/// `invoice_url`/`payload`/`paid_at` are only filled while empty
const UPSERT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    redis.call('HSET', KEYS[1],
        'invoice_id', ARGV[1],
        'user_id', ARGV[2],
        'tokens', ARGV[5],
        'created_at', ARGV[10])
end
if redis.call('HGET', KEYS[1], 'status') ~= 'credited' then
    redis.call('HSET', KEYS[1], 'status', ARGV[6])
end
redis.call('HSET', KEYS[1], 'amount', ARGV[3], 'asset', ARGV[4])
for i, field in ipairs({'invoice_url', 'payload', 'paid_at'}) do
    local current = redis.call('HGET', KEYS[1], field)
    if (not current or current == '') and ARGV[6 + i] ~= '' then
        redis.call('HSET', KEYS[1], field, ARGV[6 + i])
    end
end
return redis.call('HGETALL', KEYS[1])
";

/// Returns `{flipped, HGETALL}`; `{0, {}}` for unknown invoices. Clears the
/// credit claim at `KEYS[2]`.
const MARK_CREDITED: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return {0, {}}
end
redis.call('DEL', KEYS[2])
local flipped = 0
if redis.call('HGET', KEYS[1], 'status') ~= 'credited' then
    redis.call('HSET', KEYS[1], 'status', 'credited', 'credited_at', ARGV[1])
    local paid = redis.call('HGET', KEYS[1], 'paid_at')
    if not paid or paid == '' then
        redis.call('HSET', KEYS[1], 'paid_at', ARGV[1])
    end
    flipped = 1
end
return {flipped, redis.call('HGETALL', KEYS[1])}
";

/// 1 acquired, 0 held elsewhere, 2 already credited, -1 unknown invoice
const CLAIM_CREDIT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return -1
end
if redis.call('HGET', KEYS[1], 'status') == 'credited' then
    return 2
end
if redis.call('SET', KEYS[2], ARGV[2], 'NX', 'PX', ARGV[1]) then
    return 1
end
return 0
";

/// Redis-backed invoice store
///
/// Invoices live in hashes at `pixelmint:invoice:<invoice_id>`; credit
/// claims are expiring strings at `pixelmint:invoice:<invoice_id>:claim`.
#[derive(Clone)]
pub struct RedisInvoiceStore {
    conn: ConnectionManager,
    upsert: Script,
    mark_credited: Script,
    claim_credit: Script,
}

impl RedisInvoiceStore {
    /// Create a store over an existing managed connection
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            upsert: Script::new(UPSERT),
            mark_credited: Script::new(MARK_CREDITED),
            claim_credit: Script::new(CLAIM_CREDIT),
        }
    }
}

impl std::fmt::Debug for RedisInvoiceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisInvoiceStore").finish_non_exhaustive()
    }
}

fn decode(key: &str, fields: HashMap<String, String>) -> Result<Option<Invoice>, StoreError> {
    let Some(record) = HashRecord::new(key, fields) else {
        return Ok(None);
    };

    Ok(Some(Invoice {
        invoice_id: record.required("invoice_id")?,
        user_id: record.required("user_id")?,
        amount: record.required("amount")?,
        asset: record.text("asset").unwrap_or_default(),
        tokens: record.required("tokens")?,
        status: record.required::<InvoiceStatus>("status")?,
        invoice_url: record.text("invoice_url"),
        payload: record.text("payload"),
        created_at: record.required("created_at")?,
        paid_at: record.optional("paid_at")?,
        credited_at: record.optional("credited_at")?,
    }))
}

fn claim_key(invoice_key: &str) -> String {
    format!("{invoice_key}:claim")
}

fn stamp(ts: Option<Timestamp>) -> String {
    ts.map(|t| t.to_string()).unwrap_or_default()
}

#[async_trait]
impl InvoiceStore for RedisInvoiceStore {
    async fn get(&self, invoice_id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
        let key = key("invoice", invoice_id);
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(&key).await?;
        decode(&key, fields)
    }

    async fn upsert(&self, upsert: InvoiceUpsert) -> Result<Invoice, StoreError> {
        let key = key("invoice", upsert.invoice_id);
        let mut conn = self.conn.clone();

        let fields: HashMap<String, String> = self
            .upsert
            .key(&key)
            .arg(upsert.invoice_id)
            .arg(upsert.user_id)
            .arg(upsert.amount.to_string())
            .arg(&upsert.asset)
            .arg(upsert.tokens)
            .arg(upsert.status.as_str())
            .arg(upsert.invoice_url.as_deref().unwrap_or_default())
            .arg(upsert.payload.as_deref().unwrap_or_default())
            .arg(stamp(upsert.paid_at))
            .arg(Timestamp::now().to_string())
            .invoke_async(&mut conn)
            .await?;

        decode(&key, fields)?.ok_or_else(|| StoreError::NotFound(key))
    }

    async fn mark_credited(&self, invoice_id: InvoiceId) -> Result<Option<CreditTransition>, StoreError> {
        let key = key("invoice", invoice_id);
        let mut conn = self.conn.clone();

        let (flipped, fields): (i64, HashMap<String, String>) = self
            .mark_credited
            .key(&key)
            .key(claim_key(&key))
            .arg(Timestamp::now().to_string())
            .invoke_async(&mut conn)
            .await?;

        Ok(decode(&key, fields)?.map(|invoice| CreditTransition {
            invoice,
            transitioned: flipped == 1,
        }))
    }

    async fn claim_credit(&self, invoice_id: InvoiceId, lease: Duration) -> Result<CreditClaim, StoreError> {
        let key = key("invoice", invoice_id);
        let mut conn = self.conn.clone();
        let lease_ms = u64::try_from(lease.as_millis()).unwrap_or(u64::MAX).max(1);

        let claimed: i64 = self
            .claim_credit
            .key(&key)
            .key(claim_key(&key))
            .arg(lease_ms)
            .arg(Timestamp::now().to_string())
            .invoke_async(&mut conn)
            .await?;

        match claimed {
            1 => Ok(CreditClaim::Acquired),
            2 => Ok(CreditClaim::Credited),
            0 => Ok(CreditClaim::Held),
            _ => Err(StoreError::NotFound(key)),
        }
    }

    async fn release_credit(&self, invoice_id: InvoiceId) -> Result<(), StoreError> {
        let key = claim_key(&key("invoice", invoice_id));
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(&key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use rust_decimal::Decimal;

    use super::*;

    fn redis_url() -> Option<String> {
        std::env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty())
    }

    static COUNTER: AtomicI64 = AtomicI64::new(0);

    fn unique_invoice() -> InvoiceId {
        Timestamp::now().as_millisecond() * 1000 + COUNTER.fetch_add(1, Ordering::Relaxed)
    }

    async fn store() -> Option<RedisInvoiceStore> {
        let url = redis_url()?;
        let conn = pixelmint_core::store::connect(&url).await.expect("redis connection");
        Some(RedisInvoiceStore::new(conn))
    }

    fn snapshot(invoice_id: InvoiceId, status: &str) -> InvoiceUpsert {
        InvoiceUpsert {
            invoice_id,
            user_id: 5,
            amount: Decimal::new(110, 2),
            asset: "USDT".to_owned(),
            tokens: 5,
            status: InvoiceStatus::parse(status),
            invoice_url: Some("https://t.me/CryptoTestnetBot?start=IV1".to_owned()),
            payload: Some("user:5|tokens:5|pkg:dose".to_owned()),
            paid_at: None,
        }
    }

    #[tokio::test]
    async fn redis_upsert_never_regresses_known_fields() {
        let Some(store) = store().await else {
            return;
        };
        let id = unique_invoice();

        let first = store.upsert(snapshot(id, "active")).await.unwrap();
        let paid_at = Timestamp::now();

        let second = store
            .upsert(InvoiceUpsert {
                user_id: 99,
                tokens: 750,
                invoice_url: None,
                payload: Some("other".to_owned()),
                paid_at: Some(paid_at),
                ..snapshot(id, "PAID")
            })
            .await
            .unwrap();

        assert_eq!(second.status, InvoiceStatus::Paid);
        assert_eq!(second.user_id, 5);
        assert_eq!(second.tokens, 5);
        assert_eq!(second.invoice_url, first.invoice_url);
        assert_eq!(second.payload, first.payload);
        assert_eq!(second.paid_at, Some(paid_at));
        assert_eq!(second.created_at, first.created_at);

        let third = store
            .upsert(InvoiceUpsert {
                paid_at: Some(Timestamp::now()),
                ..snapshot(id, "paid")
            })
            .await
            .unwrap();
        assert_eq!(third.paid_at, Some(paid_at));
    }

    #[tokio::test]
    async fn redis_credited_is_terminal() {
        let Some(store) = store().await else {
            return;
        };
        let id = unique_invoice();
        store.upsert(snapshot(id, "paid")).await.unwrap();

        let first = store.mark_credited(id).await.unwrap().unwrap();
        assert!(first.transitioned);
        assert_eq!(first.invoice.status, InvoiceStatus::Credited);
        assert!(first.invoice.credited_at.is_some());
        assert!(first.invoice.paid_at.is_some());

        let second = store.mark_credited(id).await.unwrap().unwrap();
        assert!(!second.transitioned);
        assert_eq!(second.invoice.credited_at, first.invoice.credited_at);

        let merged = store.upsert(snapshot(id, "paid")).await.unwrap();
        assert_eq!(merged.status, InvoiceStatus::Credited);

        assert!(store.mark_credited(unique_invoice()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn redis_credit_claim_is_exclusive() {
        let Some(store) = store().await else {
            return;
        };
        let id = unique_invoice();
        store.upsert(snapshot(id, "paid")).await.unwrap();
        let lease = Duration::from_secs(60);

        assert_eq!(store.claim_credit(id, lease).await.unwrap(), CreditClaim::Acquired);
        assert_eq!(store.claim_credit(id, lease).await.unwrap(), CreditClaim::Held);

        store.release_credit(id).await.unwrap();
        assert_eq!(store.claim_credit(id, lease).await.unwrap(), CreditClaim::Acquired);

        store.mark_credited(id).await.unwrap();
        assert_eq!(store.claim_credit(id, lease).await.unwrap(), CreditClaim::Credited);

        let err = store.claim_credit(unique_invoice(), lease).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn redis_credit_claim_lapses() {
        let Some(store) = store().await else {
            return;
        };
        let id = unique_invoice();
        store.upsert(snapshot(id, "paid")).await.unwrap();

        assert_eq!(
            store.claim_credit(id, Duration::from_millis(20)).await.unwrap(),
            CreditClaim::Acquired
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(
            store.claim_credit(id, Duration::from_secs(60)).await.unwrap(),
            CreditClaim::Acquired
        );
    }
}
