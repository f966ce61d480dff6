use std::collections::HashMap;

use async_trait::async_trait;
use jiff::Timestamp;
use pixelmint_core::store::{HashRecord, key};
use pixelmint_core::{StoreError, UserId};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use crate::account::{Account, AccountStore, Debit, NewAccount};

/// Clamped increment in a single server-side step. Returns -1 for unknown accounts.
const ADD_TOKENS: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return -1
end
local balance = tonumber(redis.call('HGET', KEYS[1], 'tokens') or '0') + tonumber(ARGV[1])
if balance < 0 then
    balance = 0
end
redis.call('HSET', KEYS[1], 'tokens', string.format('%d', balance), 'last_seen_at', ARGV[2])
return balance
";

/// Conditional debit. Returns `{applied, balance}`.
const DEBIT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return {0, 0}
end
local balance = tonumber(redis.call('HGET', KEYS[1], 'tokens') or '0')
local amount = tonumber(ARGV[1])
if balance < amount then
    return {0, balance}
end
balance = balance - amount
redis.call('HSET', KEYS[1], 'tokens', string.format('%d', balance), 'last_seen_at', ARGV[2])
return {1, balance}
";

/// Insert-if-absent, otherwise touch `last_seen_at`
const UPSERT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 1 then
    redis.call('HSET', KEYS[1], 'last_seen_at', ARGV[4])
else
    redis.call('HSET', KEYS[1],
        'user_id', ARGV[1],
        'tokens', ARGV[2],
        'hourly_limit', ARGV[3],
        'is_blocked', '0',
        'created_at', ARGV[4],
        'last_seen_at', ARGV[4])
end
return redis.call('HGETALL', KEYS[1])
";

const SET_BLOCKED: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
redis.call('HSET', KEYS[1], 'is_blocked', ARGV[1])
return 1
";

/// Redis-backed account store
///
/// Accounts live in hashes at `pixelmint:account:<user_id>`; every
/// mutation is a Lua script so it executes atomically on the server.
#[derive(Clone)]
pub struct RedisAccountStore {
    conn: ConnectionManager,
    add_tokens: Script,
    debit: Script,
    upsert: Script,
    set_blocked: Script,
}

impl RedisAccountStore {
    /// Create a store over an existing managed connection
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            add_tokens: Script::new(ADD_TOKENS),
            debit: Script::new(DEBIT),
            upsert: Script::new(UPSERT),
            set_blocked: Script::new(SET_BLOCKED),
        }
    }
}

impl std::fmt::Debug for RedisAccountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisAccountStore").finish_non_exhaustive()
    }
}

fn decode(key: &str, fields: HashMap<String, String>) -> Result<Option<Account>, StoreError> {
    let Some(record) = HashRecord::new(key, fields) else {
        return Ok(None);
    };

    Ok(Some(Account {
        user_id: record.required("user_id")?,
        tokens: record.required("tokens")?,
        is_blocked: record.flag("is_blocked"),
        hourly_limit: record.optional("hourly_limit")?,
        created_at: record.required("created_at")?,
        last_seen_at: record.optional("last_seen_at")?,
    }))
}

#[async_trait]
impl AccountStore for RedisAccountStore {
    async fn get(&self, user_id: UserId) -> Result<Option<Account>, StoreError> {
        let key = key("account", user_id);
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(&key).await?;
        decode(&key, fields)
    }

    async fn upsert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let key = key("account", account.user_id);
        let mut conn = self.conn.clone();

        let fields: HashMap<String, String> = self
            .upsert
            .key(&key)
            .arg(account.user_id)
            .arg(account.starting_tokens)
            .arg(account.hourly_limit.map(|l| l.to_string()).unwrap_or_default())
            .arg(Timestamp::now().to_string())
            .invoke_async(&mut conn)
            .await?;

        decode(&key, fields)?.ok_or_else(|| StoreError::NotFound(key))
    }

    async fn add_tokens(&self, user_id: UserId, delta: i64) -> Result<u64, StoreError> {
        let key = key("account", user_id);
        let mut conn = self.conn.clone();

        let balance: i64 = self
            .add_tokens
            .key(&key)
            .arg(delta)
            .arg(Timestamp::now().to_string())
            .invoke_async(&mut conn)
            .await?;

        Ok(u64::try_from(balance).unwrap_or(0))
    }

    async fn debit(&self, user_id: UserId, amount: u64) -> Result<Debit, StoreError> {
        let key = key("account", user_id);
        let mut conn = self.conn.clone();

        let (applied, balance): (i64, i64) = self
            .debit
            .key(&key)
            .arg(amount)
            .arg(Timestamp::now().to_string())
            .invoke_async(&mut conn)
            .await?;

        let balance = u64::try_from(balance).unwrap_or(0);
        Ok(if applied == 1 {
            Debit::Applied(balance)
        } else {
            Debit::Insufficient(balance)
        })
    }

    async fn set_blocked(&self, user_id: UserId, blocked: bool) -> Result<(), StoreError> {
        let key = key("account", user_id);
        let mut conn = self.conn.clone();

        let updated: i64 = self
            .set_blocked
            .key(&key)
            .arg(if blocked { "1" } else { "0" })
            .invoke_async(&mut conn)
            .await?;

        if updated == 0 {
            return Err(StoreError::NotFound(format!("account {user_id}")));
        }
        Ok(())
    }
}
