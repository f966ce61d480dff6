use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use jiff::Timestamp;
use pixelmint_core::{StoreError, UserId};

/// What was generated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    /// Free-form prompt
    Prompt,
    /// Styled photosession
    Photosession,
}

/// Generation lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStatus {
    /// Charged, waiting for the model
    Processing,
    /// Image stored
    Ready,
    /// Failed and refunded
    Failed,
}

impl GenerationKind {
    /// Storage representation
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Photosession => "photosession",
        }
    }
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prompt" => Ok(Self::Prompt),
            "photosession" => Ok(Self::Photosession),
            other => Err(format!("unknown generation kind '{other}'")),
        }
    }
}

impl GenerationStatus {
    /// Storage representation
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "ready" => Ok(Self::Ready),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown generation status '{other}'")),
        }
    }
}

/// A charged generation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRecord {
    /// Store-assigned id, increasing
    pub id: u64,
    /// Owner
    pub user_id: UserId,
    /// Prompt or photosession
    pub kind: GenerationKind,
    /// Prompt text as entered
    pub prompt: String,
    /// Template or style
    pub template: Option<String>,
    /// Lifecycle state
    pub status: GenerationStatus,
    /// Tokens charged
    pub tokens_spent: u64,
    /// Where the image was stored
    pub result_location: Option<String>,
    /// Creation time
    pub created_at: Timestamp,
}

/// Fields for a new `processing` record
#[derive(Debug, Clone)]
pub struct NewGeneration {
    pub user_id: UserId,
    pub kind: GenerationKind,
    pub prompt: String,
    pub template: Option<String>,
    pub tokens_spent: u64,
}

/// Generation history
#[async_trait]
pub trait GenerationStore: Send + Sync {
    /// Insert a `processing` record
    async fn create(&self, generation: NewGeneration) -> Result<GenerationRecord, StoreError>;

    /// Set the status and, if given, the result location
    async fn update_status(
        &self,
        id: u64,
        status: GenerationStatus,
        result_location: Option<String>,
    ) -> Result<(), StoreError>;

    /// Most recent records of a user, newest first
    async fn list_for_user(&self, user_id: UserId, limit: usize) -> Result<Vec<GenerationRecord>, StoreError>;
}
