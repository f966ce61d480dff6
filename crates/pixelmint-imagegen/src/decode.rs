use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use crate::error::GenerationError;

/// One way of locating the base64 image in a response
type Strategy = fn(&Value) -> Option<&str>;

/// Tried in order; the first hit wins
const STRATEGIES: [Strategy; 3] = [candidate_parts, content_parts, image_list];

/// Extract and decode the generated image from a model response
pub fn extract_image(response: &Value) -> Result<Vec<u8>, GenerationError> {
    let encoded = STRATEGIES
        .iter()
        .find_map(|strategy| strategy(response))
        .ok_or(GenerationError::EmptyResponse)?;

    STANDARD
        .decode(encoded.trim())
        .map_err(|e| GenerationError::InvalidImageData(e.to_string()))
}

/// `candidates[].content.parts[]`
fn candidate_parts(response: &Value) -> Option<&str> {
    response
        .get("candidates")?
        .as_array()?
        .iter()
        .filter_map(|candidate| candidate.get("content")?.get("parts")?.as_array())
        .find_map(|parts| inline_data(parts))
}

/// `contents[].parts[]`
fn content_parts(response: &Value) -> Option<&str> {
    response
        .get("contents")?
        .as_array()?
        .iter()
        .filter_map(|content| content.get("parts")?.as_array())
        .find_map(|parts| inline_data(parts))
}

/// First element of `images` or `data`, as a string or `{b64_json | content}`
fn image_list(response: &Value) -> Option<&str> {
    let first = ["images", "data"]
        .iter()
        .filter_map(|key| response.get(key)?.as_array()?.first())
        .next()?;

    match first {
        Value::String(raw) => Some(raw.as_str()),
        Value::Object(object) => ["b64_json", "content"]
            .iter()
            .filter_map(|key| object.get(*key)?.as_str())
            .find(|raw| !raw.is_empty()),
        _ => None,
    }
}

fn inline_data(parts: &[Value]) -> Option<&str> {
    parts.iter().find_map(|part| {
        let inline = part.get("inline_data").or_else(|| part.get("inlineData"))?;
        inline.get("data")?.as_str().filter(|data| !data.is_empty())
    })
}
