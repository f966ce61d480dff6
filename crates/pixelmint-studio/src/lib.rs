#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod error;
mod images;
mod record;
pub mod storage;
mod studio;

pub use error::StudioError;
pub use images::{FsImageStorage, ImageStorage};
pub use record::{GenerationKind, GenerationRecord, GenerationStatus, GenerationStore, NewGeneration};
pub use storage::{memory::MemoryGenerationStore, redis::RedisGenerationStore};
pub use studio::{GenerationOutput, Studio};
