use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

/// Blob storage for generated images
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Persist an image and return where it was stored
    async fn save_generated_image(&self, data: &[u8]) -> std::io::Result<String>;
}

/// Stores images as files under a directory
#[derive(Debug, Clone)]
pub struct FsImageStorage {
    root: PathBuf,
}

impl FsImageStorage {
    /// Store images under `root`, created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ImageStorage for FsImageStorage {
    async fn save_generated_image(&self, data: &[u8]) -> std::io::Result<String> {
        tokio::fs::create_dir_all(&self.root).await?;

        let path = self.root.join(format!("{}.png", Uuid::new_v4().simple()));
        tokio::fs::write(&path, data).await?;

        tracing::debug!(path = %path.display(), bytes = data.len(), "image saved");

        Ok(path.to_string_lossy().into_owned())
    }
}
