use std::fmt;
use std::path::PathBuf;

use pixelmint_core::UserFacing;
use serde_json::Value;
use thiserror::Error;

/// Body of a non-2xx upstream response
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    /// Body parsed as JSON
    Json(Value),
    /// Body that was not valid JSON
    Text(String),
}

impl fmt::Display for UpstreamBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Non-2xx response from the model endpoint
#[derive(Debug, Clone, Error)]
#[error("upstream API error ({status}): {body}")]
pub struct UpstreamError {
    /// HTTP status
    pub status: u16,
    /// Response body
    pub body: UpstreamBody,
}

impl UpstreamError {
    /// Build from a status and raw body, parsing the body as JSON when possible
    pub fn from_response(status: u16, raw: String) -> Self {
        let body = serde_json::from_str(&raw).map_or(UpstreamBody::Text(raw), UpstreamBody::Json);
        Self { status, body }
    }

    /// The request named a model the endpoint rejects
    ///
    /// True for 400/401/403/404 responses whose `detail` or `error.message`
    /// mentions "model".
    pub fn is_model_error(&self) -> bool {
        if !matches!(self.status, 400 | 401 | 403 | 404) {
            return false;
        }
        let UpstreamBody::Json(Value::Object(body)) = &self.body else {
            return false;
        };

        let mut message = body.get("detail").map(text_of).unwrap_or_default();
        if let Some(Value::Object(error)) = body.get("error") {
            message.push_str(&error.get("message").map(text_of).unwrap_or_default());
        }

        message.to_lowercase().contains("model")
    }

    /// A safety filter rejected the request shape for this model
    ///
    /// True for 400/500 responses whose `error.message` mentions both
    /// "guardrail" and "model".
    pub fn is_guardrail_model_block(&self) -> bool {
        if !matches!(self.status, 400 | 500) {
            return false;
        }

        let message = self.error_message().unwrap_or_default().to_lowercase();
        message.contains("guardrail") && message.contains("model")
    }

    /// Most specific message the upstream gave
    pub fn message(&self) -> String {
        match &self.body {
            UpstreamBody::Json(body) => self
                .error_message()
                .or_else(|| body.get("detail").map(text_of))
                .unwrap_or_else(|| body.to_string()),
            UpstreamBody::Text(text) => text.clone(),
        }
    }

    fn error_message(&self) -> Option<String> {
        let UpstreamBody::Json(body) = &self.body else {
            return None;
        };
        match body.get("error") {
            Some(Value::Object(error)) => error.get("message").map(text_of),
            _ => None,
        }
    }
}

fn text_of(value: &Value) -> String {
    value.as_str().map_or_else(|| value.to_string(), ToOwned::to_owned)
}

/// Image generation failures
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Upstream returned a non-2xx response that fallback could not recover
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Network, TLS or timeout failure
    #[error("connection error: {0}")]
    Connection(String),

    /// The response carried no image
    #[error("model response contained no image")]
    EmptyResponse,

    /// The image payload was not valid base64
    #[error("invalid image data: {0}")]
    InvalidImageData(String),

    /// A reference image exists but could not be read
    #[error("failed to read reference image {}: {source}", .path.display())]
    ReferenceImage {
        /// Offending file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The response body was not valid JSON
    #[error("failed to decode model response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

impl UserFacing for GenerationError {
    fn error_kind(&self) -> &str {
        match self {
            Self::Upstream(_) => "upstream_error",
            Self::Connection(_) => "connection_error",
            Self::EmptyResponse => "empty_response",
            Self::InvalidImageData(_) | Self::Decode(_) => "invalid_response",
            Self::ReferenceImage { .. } => "reference_image",
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::Upstream(err) => err.message(),
            Self::EmptyResponse => "The model returned an empty response".to_owned(),
            Self::Connection(_) => "The image service is unreachable, please try again".to_owned(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn upstream(status: u16, body: &Value) -> UpstreamError {
        UpstreamError::from_response(status, body.to_string())
    }

    #[test]
    fn model_error_requires_status_and_mention() {
        let body = json!({ "error": { "message": "Model gemini-x is not found" } });

        assert!(upstream(404, &body).is_model_error());
        assert!(upstream(400, &json!({ "detail": "Unknown MODEL" })).is_model_error());
        assert!(!upstream(500, &body).is_model_error());
        assert!(!upstream(400, &json!({ "error": { "message": "quota exceeded" } })).is_model_error());
    }

    #[test]
    fn text_body_is_never_a_model_error() {
        let err = UpstreamError::from_response(404, "model not found".to_owned());

        assert_eq!(err.body, UpstreamBody::Text("model not found".to_owned()));
        assert!(!err.is_model_error());
        assert_eq!(err.message(), "model not found");
    }

    #[test]
    fn guardrail_block_requires_both_words() {
        let blocked = json!({ "error": { "message": "Request blocked by Guardrail for this model" } });

        assert!(upstream(400, &blocked).is_guardrail_model_block());
        assert!(upstream(500, &blocked).is_guardrail_model_block());
        assert!(!upstream(403, &blocked).is_guardrail_model_block());
        assert!(!upstream(400, &json!({ "error": { "message": "guardrail" } })).is_guardrail_model_block());
        assert!(!upstream(400, &json!({ "detail": "guardrail model" })).is_guardrail_model_block());
    }

    #[test]
    fn user_message_prefers_upstream_error_message() {
        let err = GenerationError::from(upstream(500, &json!({ "error": { "message": "backend overloaded" } })));

        assert_eq!(err.user_message(), "backend overloaded");
        assert_eq!(err.error_kind(), "upstream_error");
    }
}
