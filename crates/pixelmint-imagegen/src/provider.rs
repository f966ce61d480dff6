use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::GenerationError;
use crate::prompt::Orientation;

/// Free-form prompt generation
#[derive(Debug, Clone, Default)]
pub struct PromptRequest {
    /// User prompt
    pub prompt: String,
    /// Optional template prefix (e.g. a style name)
    pub template: Option<String>,
    /// Reference images, in order
    pub references: Vec<PathBuf>,
}

/// Styled photosession from reference faces
#[derive(Debug, Clone, Default)]
pub struct PhotosessionRequest {
    /// Style name
    pub style: String,
    /// Optional user prompt replacing the generic style description
    pub prompt: Option<String>,
    /// Framing
    pub orientation: Orientation,
    /// Reference images, in order
    pub references: Vec<PathBuf>,
}

/// What to generate
#[derive(Debug, Clone)]
pub enum GenerationRequest {
    /// See [`PromptRequest`]
    Prompt(PromptRequest),
    /// See [`PhotosessionRequest`]
    Photosession(PhotosessionRequest),
}

impl GenerationRequest {
    /// Record kind (`prompt` or `photosession`)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Prompt(_) => "prompt",
            Self::Photosession(_) => "photosession",
        }
    }
}

/// Decoded image and the model that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Raw image bytes
    pub data: Vec<u8>,
    /// Model that served the request
    pub model: String,
}

/// Anything that can turn a [`GenerationRequest`] into an image
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate a single image
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, GenerationError>;
}
