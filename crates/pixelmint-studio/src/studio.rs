use std::sync::Arc;

use pixelmint_core::{UserFacing, UserId};
use pixelmint_imagegen::{GeneratedImage, GenerationRequest, ImageGenerator};
use pixelmint_ledger::{Debit, TokenLedger};

use crate::error::StudioError;
use crate::images::ImageStorage;
use crate::record::{GenerationKind, GenerationRecord, GenerationStatus, GenerationStore, NewGeneration};

/// A successful generation
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    /// History record, now `ready`
    pub record_id: u64,
    /// Generated image
    pub image: GeneratedImage,
    /// Where the image was stored
    pub location: String,
    /// Balance after the charge
    pub balance: u64,
}

/// Charges for a generation, runs it and refunds on failure
///
/// Order of operations: blocked check, conditional debit of the full cost,
/// `processing` record, generate, store the image, mark `ready`. The debit
/// removes all of `cost` or nothing, so any failure after it refunds exactly
/// `cost` and marks the record `failed`.
#[derive(Clone)]
pub struct Studio {
    ledger: TokenLedger,
    generator: Arc<dyn ImageGenerator>,
    records: Arc<dyn GenerationStore>,
    images: Arc<dyn ImageStorage>,
}

impl Studio {
    pub fn new(
        ledger: TokenLedger,
        generator: Arc<dyn ImageGenerator>,
        records: Arc<dyn GenerationStore>,
        images: Arc<dyn ImageStorage>,
    ) -> Self {
        Self {
            ledger,
            generator,
            records,
            images,
        }
    }

    /// Run a charged generation
    ///
    /// The work runs on its own task, so the refund still happens if the
    /// caller stops waiting.
    pub async fn run_generation(
        &self,
        user_id: UserId,
        cost: u64,
        request: GenerationRequest,
    ) -> Result<GenerationOutput, StudioError> {
        let studio = self.clone();
        let task = tokio::spawn(async move { studio.execute(user_id, cost, request).await });

        task.await.map_err(|e| {
            tracing::error!(user_id, error = %e, "generation task aborted");
            StudioError::GenerationFailed { message: e.to_string() }
        })?
    }

    /// Recent generations of a user, newest first
    pub async fn history(&self, user_id: UserId, limit: usize) -> Result<Vec<GenerationRecord>, StudioError> {
        Ok(self.records.list_for_user(user_id, limit).await?)
    }

    async fn execute(
        &self,
        user_id: UserId,
        cost: u64,
        request: GenerationRequest,
    ) -> Result<GenerationOutput, StudioError> {
        let account = self.ledger.accounts().get(user_id).await?;
        if account.as_ref().is_some_and(|a| a.is_blocked) {
            return Err(StudioError::Blocked);
        }

        let balance = match self.ledger.try_spend(user_id, cost).await? {
            Debit::Applied(balance) => balance,
            Debit::Insufficient(available) => {
                return Err(StudioError::InsufficientBalance {
                    required: cost,
                    available,
                });
            }
        };

        let record = match self.records.create(new_generation(user_id, cost, &request)).await {
            Ok(record) => record,
            Err(err) => {
                self.refund(user_id, cost).await?;
                return Err(err.into());
            }
        };

        tracing::info!(user_id, record_id = record.id, kind = %record.kind, cost, balance, "generation started");

        let result = match self.generator.generate(&request).await {
            Ok(image) => match self.images.save_generated_image(&image.data).await {
                Ok(location) => Ok((image, location)),
                Err(e) => Err(format!("failed to store image: {e}")),
            },
            Err(e) => Err(e.user_message()),
        };

        match result {
            Ok((image, location)) => {
                if let Err(e) = self
                    .records
                    .update_status(record.id, GenerationStatus::Ready, Some(location.clone()))
                    .await
                {
                    tracing::error!(record_id = record.id, error = %e, "failed to mark generation ready");
                }

                tracing::info!(user_id, record_id = record.id, model = %image.model, "generation ready");

                Ok(GenerationOutput {
                    record_id: record.id,
                    image,
                    location,
                    balance,
                })
            }
            Err(message) => {
                tracing::warn!(user_id, record_id = record.id, error = %message, "generation failed, refunding");

                let refunded = self.refund(user_id, cost).await;

                if let Err(e) = self.records.update_status(record.id, GenerationStatus::Failed, None).await {
                    tracing::error!(record_id = record.id, error = %e, "failed to mark generation failed");
                }

                refunded?;

                Err(StudioError::GenerationFailed { message })
            }
        }
    }

    async fn refund(&self, user_id: UserId, cost: u64) -> Result<u64, StudioError> {
        let balance = self.ledger.add(user_id, cost).await.inspect_err(|e| {
            tracing::error!(user_id, cost, error = %e, "refund failed");
        })?;
        tracing::debug!(user_id, cost, balance, "generation cost refunded");
        Ok(balance)
    }
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio").finish_non_exhaustive()
    }
}

fn new_generation(user_id: UserId, cost: u64, request: &GenerationRequest) -> NewGeneration {
    match request {
        GenerationRequest::Prompt(prompt) => NewGeneration {
            user_id,
            kind: GenerationKind::Prompt,
            prompt: prompt.prompt.clone(),
            template: prompt.template.clone(),
            tokens_spent: cost,
        },
        GenerationRequest::Photosession(session) => NewGeneration {
            user_id,
            kind: GenerationKind::Photosession,
            prompt: session.prompt.clone().unwrap_or_default(),
            template: Some(session.style.clone()),
            tokens_spent: cost,
        },
    }
}
