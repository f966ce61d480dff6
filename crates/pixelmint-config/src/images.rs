use std::path::PathBuf;

use serde::Deserialize;

/// Where generated images are written
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImagesConfig {
    /// Output directory for generated images
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("storage/generations")
}
