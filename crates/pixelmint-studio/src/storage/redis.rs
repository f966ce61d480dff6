use std::collections::HashMap;

use async_trait::async_trait;
use jiff::Timestamp;
use pixelmint_core::store::{HashRecord, key};
use pixelmint_core::{StoreError, UserId};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use crate::record::{GenerationRecord, GenerationStatus, GenerationStore, NewGeneration};

/// Assign the next id, write the record and index it under its owner
const CREATE: &str = r"
local id = redis.call('INCR', KEYS[1])
local record = KEYS[2] .. id
redis.call('HSET', record,
    'id', id,
    'user_id', ARGV[1],
    'kind', ARGV[2],
    'prompt', ARGV[3],
    'template', ARGV[4],
    'status', 'processing',
    'tokens_spent', ARGV[5],
    'created_at', ARGV[6])
redis.call('LPUSH', KEYS[3], id)
return id
";

const UPDATE_STATUS: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
redis.call('HSET', KEYS[1], 'status', ARGV[1])
if ARGV[2] ~= '' then
    redis.call('HSET', KEYS[1], 'result_location', ARGV[2])
end
return 1
";

/// Redis-backed generation history
///
/// Records are hashes at `pixelmint:generation:<id>`; each user's ids are
/// kept newest first in the list `pixelmint:generations:<user_id>`.
#[derive(Clone)]
pub struct RedisGenerationStore {
    conn: ConnectionManager,
    create: Script,
    update_status: Script,
}

impl RedisGenerationStore {
    /// Create a store over an existing managed connection
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            create: Script::new(CREATE),
            update_status: Script::new(UPDATE_STATUS),
        }
    }
}

impl std::fmt::Debug for RedisGenerationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisGenerationStore").finish_non_exhaustive()
    }
}

fn decode(key: &str, fields: HashMap<String, String>) -> Result<Option<GenerationRecord>, StoreError> {
    let Some(record) = HashRecord::new(key, fields) else {
        return Ok(None);
    };

    Ok(Some(GenerationRecord {
        id: record.required("id")?,
        user_id: record.required("user_id")?,
        kind: record.required("kind")?,
        prompt: record.text("prompt").unwrap_or_default(),
        template: record.text("template"),
        status: record.required("status")?,
        tokens_spent: record.required("tokens_spent")?,
        result_location: record.text("result_location"),
        created_at: record.required("created_at")?,
    }))
}

#[async_trait]
impl GenerationStore for RedisGenerationStore {
    async fn create(&self, generation: NewGeneration) -> Result<GenerationRecord, StoreError> {
        let mut conn = self.conn.clone();
        let created_at = Timestamp::now();

        let id: u64 = self
            .create
            .key(key("generation", "seq"))
            .key(key("generation", ""))
            .key(key("generations", generation.user_id))
            .arg(generation.user_id)
            .arg(generation.kind.as_str())
            .arg(&generation.prompt)
            .arg(generation.template.as_deref().unwrap_or_default())
            .arg(generation.tokens_spent)
            .arg(created_at.to_string())
            .invoke_async(&mut conn)
            .await?;

        Ok(GenerationRecord {
            id,
            user_id: generation.user_id,
            kind: generation.kind,
            prompt: generation.prompt,
            template: generation.template,
            status: GenerationStatus::Processing,
            tokens_spent: generation.tokens_spent,
            result_location: None,
            created_at,
        })
    }

    async fn update_status(
        &self,
        id: u64,
        status: GenerationStatus,
        result_location: Option<String>,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();

        let updated: i64 = self
            .update_status
            .key(key("generation", id))
            .arg(status.as_str())
            .arg(result_location.unwrap_or_default())
            .invoke_async(&mut conn)
            .await?;

        if updated == 0 {
            return Err(StoreError::NotFound(format!("generation {id}")));
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId, limit: usize) -> Result<Vec<GenerationRecord>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.clone();
        let stop = isize::try_from(limit).unwrap_or(isize::MAX) - 1;
        let ids: Vec<u64> = conn.lrange(key("generations", user_id), 0, stop).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.hgetall(key("generation", id));
        }
        let replies: Vec<HashMap<String, String>> = pipe.query_async(&mut conn).await?;

        let mut records = Vec::with_capacity(ids.len());
        for (id, fields) in ids.iter().zip(replies) {
            if let Some(record) = decode(&key("generation", id), fields)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;
    use crate::record::GenerationKind;

    fn redis_url() -> Option<String> {
        std::env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty())
    }

    static COUNTER: AtomicI64 = AtomicI64::new(0);

    fn unique_user() -> UserId {
        Timestamp::now().as_millisecond() * 1000 + COUNTER.fetch_add(1, Ordering::Relaxed)
    }

    async fn store() -> Option<RedisGenerationStore> {
        let url = redis_url()?;
        let conn = pixelmint_core::store::connect(&url).await.expect("redis connection");
        Some(RedisGenerationStore::new(conn))
    }

    fn generation(user_id: UserId, prompt: &str) -> NewGeneration {
        NewGeneration {
            user_id,
            kind: GenerationKind::Prompt,
            prompt: prompt.to_owned(),
            template: None,
            tokens_spent: 1,
        }
    }

    #[tokio::test]
    async fn redis_history_is_newest_first() {
        let Some(store) = store().await else {
            return;
        };
        let user_id = unique_user();

        let first = store.create(generation(user_id, "first")).await.unwrap();
        let second = store.create(generation(user_id, "second")).await.unwrap();
        let third = store.create(generation(user_id, "third")).await.unwrap();
        assert!(first.id < second.id && second.id < third.id);

        let listed = store.list_for_user(user_id, 2).await.unwrap();
        let ids: Vec<u64> = listed.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![third.id, second.id]);
        assert_eq!(listed[0].prompt, "third");
        assert_eq!(listed[0].status, GenerationStatus::Processing);

        assert!(store.list_for_user(user_id, 0).await.unwrap().is_empty());
        assert!(store.list_for_user(unique_user(), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn redis_status_update_keeps_location_unless_given() {
        let Some(store) = store().await else {
            return;
        };
        let user_id = unique_user();
        let record = store.create(generation(user_id, "cat")).await.unwrap();

        store
            .update_status(record.id, GenerationStatus::Ready, Some("out/cat.png".to_owned()))
            .await
            .unwrap();
        store.update_status(record.id, GenerationStatus::Failed, None).await.unwrap();

        let stored = store.list_for_user(user_id, 1).await.unwrap().remove(0);
        assert_eq!(stored.status, GenerationStatus::Failed);
        assert_eq!(stored.result_location.as_deref(), Some("out/cat.png"));

        assert!(matches!(
            store.update_status(u64::MAX, GenerationStatus::Ready, None).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
