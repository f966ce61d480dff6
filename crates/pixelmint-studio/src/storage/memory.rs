use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use jiff::Timestamp;
use pixelmint_core::{StoreError, UserId};

use crate::record::{GenerationRecord, GenerationStatus, GenerationStore, NewGeneration};

/// In-memory generation history
#[derive(Debug, Default)]
pub struct MemoryGenerationStore {
    next_id: AtomicU64,
    records: DashMap<u64, GenerationRecord>,
}

impl MemoryGenerationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GenerationStore for MemoryGenerationStore {
    async fn create(&self, generation: NewGeneration) -> Result<GenerationRecord, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let record = GenerationRecord {
            id,
            user_id: generation.user_id,
            kind: generation.kind,
            prompt: generation.prompt,
            template: generation.template,
            status: GenerationStatus::Processing,
            tokens_spent: generation.tokens_spent,
            result_location: None,
            created_at: Timestamp::now(),
        };

        self.records.insert(id, record.clone());
        Ok(record)
    }

    async fn update_status(
        &self,
        id: u64,
        status: GenerationStatus,
        result_location: Option<String>,
    ) -> Result<(), StoreError> {
        let mut record = self
            .records
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("generation {id}")))?;

        record.status = status;
        if result_location.is_some() {
            record.result_location = result_location;
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId, limit: usize) -> Result<Vec<GenerationRecord>, StoreError> {
        let mut records: Vec<GenerationRecord> = self
            .records
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.value().clone())
            .collect();

        records.sort_unstable_by(|a, b| b.id.cmp(&a.id));
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::GenerationKind;

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
    async fn history_is_newest_first_and_per_user() {
        let store = MemoryGenerationStore::new();
        for prompt in ["first", "second", "third"] {
            store.create(generation(1, prompt)).await.unwrap();
        }
        store.create(generation(2, "other")).await.unwrap();

        let history = store.list_for_user(1, 2).await.unwrap();

        let prompts: Vec<&str> = history.iter().map(|r| r.prompt.as_str()).collect();
        assert_eq!(prompts, ["third", "second"]);
    }

    #[tokio::test]
    async fn status_updates_keep_location() {
        let store = MemoryGenerationStore::new();
        let record = store.create(generation(1, "cat")).await.unwrap();
        assert_eq!(record.status, GenerationStatus::Processing);

        store
            .update_status(record.id, GenerationStatus::Ready, Some("out/cat.png".to_owned()))
            .await
            .unwrap();

        let stored = store.list_for_user(1, 10).await.unwrap().remove(0);
        assert_eq!(stored.status, GenerationStatus::Ready);
        assert_eq!(stored.result_location.as_deref(), Some("out/cat.png"));
        assert!(matches!(
            store.update_status(99, GenerationStatus::Failed, None).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
