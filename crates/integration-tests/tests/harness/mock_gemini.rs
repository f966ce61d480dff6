//! `generateContent` mock backed by wiremock

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// "png!" in base64
pub const IMAGE_B64: &str = "cG5nIQ==";

pub struct MockGemini {
    server: MockServer,
}

impl MockGemini {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Model answers with an inline image
    pub async fn serve_image(&self, model: &str) {
        self.mount(
            model,
            ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [
                    { "text": "Here is your image" },
                    { "inlineData": { "mimeType": "image/png", "data": IMAGE_B64 } }
                ] } }]
            })),
        )
        .await;
    }

    /// Model answers 200 without an image
    pub async fn serve_text_only(&self, model: &str) {
        self.mount(
            model,
            ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "I cannot draw that" }] } }]
            })),
        )
        .await;
    }

    /// Model is rejected as unknown
    pub async fn reject_model(&self, model: &str) {
        self.mount(
            model,
            ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": 404, "message": format!("models/{model} is not found"), "status": "NOT_FOUND" }
            })),
        )
        .await;
    }

    /// Number of calls a model received
    pub async fn calls(&self, model: &str) -> usize {
        let target = format!("/v1beta/models/{model}:generateContent");
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == target)
            .count()
    }

    async fn mount(&self, model: &str, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(format!("/v1beta/models/{model}:generateContent")))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }
}
