#![allow(
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions
)]

mod client;
mod decode;
mod error;
mod prompt;
mod provider;
mod types;

pub use client::GenerationClient;
pub use decode::extract_image;
pub use error::{GenerationError, UpstreamBody, UpstreamError};
pub use prompt::{Orientation, photosession_prompt, prompt_text};
pub use provider::{GeneratedImage, GenerationRequest, ImageGenerator, PhotosessionRequest, PromptRequest};
