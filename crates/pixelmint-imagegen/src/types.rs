use serde::Serialize;

/// Harm categories relaxed on every request
const HARM_CATEGORIES: [&str; 5] = [
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_CIVIC_INTEGRITY",
];

/// Wire format for `models/{model}:generateContent`
#[derive(Debug, Clone, Serialize)]
pub(crate) struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<SafetySetting>,
}

impl GenerateContentRequest {
    /// Single user turn: reference images first, then the instruction
    pub fn user_turn(images: &[InlineData], text: &str) -> Self {
        let mut parts: Vec<Part> = images
            .iter()
            .cloned()
            .map(|inline_data| Part::Inline { inline_data })
            .collect();
        parts.push(Part::Text { text: text.to_owned() });

        Self {
            contents: vec![Content { role: "user", parts }],
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum Part {
    Inline { inline_data: InlineData },
    Text { text: String },
}

/// Base64-encoded reference image
#[derive(Debug, Clone, Serialize)]
pub(crate) struct InlineData {
    pub mime_type: &'static str,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}
