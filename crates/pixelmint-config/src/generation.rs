use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Upstream image model configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// API key; keys starting with `sk-` are sent as a bearer token
    pub api_key: SecretString,
    /// Base URL of the `generateContent` API
    #[serde(default = "default_base_url")]
    pub base_url: Url,
    /// Preferred model identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// Model tried when the preferred one is rejected for model-specific reasons
    #[serde(default)]
    pub fallback_model: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GenerationConfig {
    /// Fallback model with blank values treated as unset
    pub fn fallback_model(&self) -> Option<&str> {
        self.fallback_model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

fn default_base_url() -> Url {
    Url::parse("https://generativelanguage.googleapis.com/v1beta").expect("valid default URL")
}

fn default_model() -> String {
    "gemini-2.5-flash-image-preview".to_owned()
}

fn default_timeout_secs() -> u64 {
    120
}
