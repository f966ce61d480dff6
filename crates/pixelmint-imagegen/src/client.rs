use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pixelmint_config::GenerationConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use url::Url;

use crate::decode::extract_image;
use crate::error::{GenerationError, UpstreamError};
use crate::prompt::{photosession_prompt, prompt_text};
use crate::provider::{GeneratedImage, GenerationRequest, ImageGenerator, PhotosessionRequest, PromptRequest};
use crate::types::{GenerateContentRequest, InlineData};

/// Client for the `generateContent` image API
///
/// Requests go to the preferred model first. A model-specific rejection
/// moves on to the fallback model, any other failure is returned as is.
#[derive(Clone)]
pub struct GenerationClient {
    http: Client,
    base_url: Url,
    api_key: SecretString,
    model: String,
    fallback_model: Option<String>,
}

impl GenerationClient {
    /// Create a client
    ///
    /// A blank `fallback_model`, or one equal to `model`, is ignored.
    pub fn new(
        base_url: Url,
        api_key: SecretString,
        model: impl Into<String>,
        fallback_model: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let model = model.into();
        let fallback_model = fallback_model
            .map(|m| m.trim().to_owned())
            .filter(|m| !m.is_empty() && *m != model);

        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url,
            api_key,
            model,
            fallback_model,
        })
    }

    /// Create a client from the `[generation]` section
    pub fn from_config(config: &GenerationConfig) -> Result<Self, GenerationError> {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            config.model.clone(),
            config.fallback_model().map(ToOwned::to_owned),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Models tried, in order
    pub fn models(&self) -> Vec<&str> {
        std::iter::once(self.model.as_str())
            .chain(self.fallback_model.as_deref())
            .collect()
    }

    /// Generate from a prompt, optionally prefixed by a template
    pub async fn generate_prompt(&self, request: &PromptRequest) -> Result<GeneratedImage, GenerationError> {
        let images = inline_images(&request.references).await?;
        let text = prompt_text(&request.prompt, request.template.as_deref());

        self.with_fallback(&GenerateContentRequest::user_turn(&images, &text))
            .await
    }

    /// Generate a photosession
    ///
    /// If a guardrail rejects the first pass, the whole fallback sequence is
    /// repeated once without reference images.
    pub async fn generate_photosession(
        &self,
        request: &PhotosessionRequest,
    ) -> Result<GeneratedImage, GenerationError> {
        let images = inline_images(&request.references).await?;
        let text = photosession_prompt(&request.style, request.prompt.as_deref(), request.orientation);

        match self
            .with_fallback(&GenerateContentRequest::user_turn(&images, &text))
            .await
        {
            Err(GenerationError::Upstream(err)) if err.is_guardrail_model_block() => {
                tracing::warn!(
                    status = err.status,
                    style = %request.style,
                    references = images.len(),
                    "guardrail blocked request, retrying text-only"
                );
                self.with_fallback(&GenerateContentRequest::user_turn(&[], &text))
                    .await
            }
            other => other,
        }
    }

    /// Walk the candidate models until one answers
    async fn with_fallback(&self, body: &GenerateContentRequest) -> Result<GeneratedImage, GenerationError> {
        let models = self.models();
        let mut attempt = 0;

        loop {
            let model = models[attempt];
            let has_next = attempt + 1 < models.len();

            match self.post(model, body).await {
                Ok(response) => {
                    let data = extract_image(&response)?;
                    tracing::debug!(model = %model, bytes = data.len(), "image generated");
                    return Ok(GeneratedImage {
                        data,
                        model: model.to_owned(),
                    });
                }
                Err(GenerationError::Upstream(err)) if err.is_model_error() && has_next => {
                    tracing::warn!(
                        model = %model,
                        status = err.status,
                        next = %models[attempt + 1],
                        "model rejected, falling back"
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn post(&self, model: &str, body: &GenerateContentRequest) -> Result<Value, GenerationError> {
        let url = format!(
            "{}/models/{model}:generateContent",
            self.base_url.as_str().trim_end_matches('/')
        );

        tracing::debug!(model = %model, "sending generateContent request");

        let key = self.api_key.expose_secret();
        let request = if key.starts_with("sk-") {
            self.http.post(&url).bearer_auth(key)
        } else {
            self.http.post(&url).header("x-goog-api-key", key)
        };

        let response = request.json(body).send().await.map_err(|e| {
            tracing::error!(model = %model, error = %e, "generateContent request failed");
            GenerationError::from(e)
        })?;

        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(model = %model, status = %status, "generateContent API error");
            return Err(UpstreamError::from_response(status.as_u16(), text).into());
        }

        response
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ImageGenerator for GenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, GenerationError> {
        match request {
            GenerationRequest::Prompt(prompt) => self.generate_prompt(prompt).await,
            GenerationRequest::Photosession(session) => self.generate_photosession(session).await,
        }
    }
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("fallback_model", &self.fallback_model)
            .finish_non_exhaustive()
    }
}

/// Read reference images, skipping files that do not exist
async fn inline_images(paths: &[PathBuf]) -> Result<Vec<InlineData>, GenerationError> {
    let mut images = Vec::with_capacity(paths.len());

    for path in paths {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "reference image missing, skipping");
                continue;
            }
            Err(source) => {
                return Err(GenerationError::ReferenceImage {
                    path: path.clone(),
                    source,
                });
            }
        };

        images.push(InlineData {
            mime_type: mime_type(path),
            data: STANDARD.encode(bytes),
        });
    }

    Ok(images)
}

fn mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}
