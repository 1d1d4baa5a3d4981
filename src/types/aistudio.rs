use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Finish reasons returned by AiStudio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum FinishReason {
    FINISH_REASON_UNSPECIFIED,
    STOP,
    MAX_TOKENS,
    SAFETY,
    RECITATION,
    LANGUAGE,
    OTHER,
    BLOCKLIST,
    PROHIBITED_CONTENT,
    SPII,
    MALFORMED_FUNCTION_CALL,
    IMAGE_SAFETY,
}

/// Chat content payload, shared by requests and candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// `generateContent` request body.
#[derive(Debug, Clone, Serialize)]
#[allow(non_snake_case)]
pub struct GenerateContentRequest {
    pub contents: Vec<Chat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generationConfig: Option<Value>,
}

impl GenerateContentRequest {
    /// Single user turn with deterministic sampling.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Chat {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.into()),
                }],
            }],
            generationConfig: Some(serde_json::json!({ "temperature": 0.0 })),
        }
    }
}

/// AiStudio candidate wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct Candidate {
    pub content: Chat,
    #[serde(default)]
    pub finishReason: Option<FinishReason>,
}

/// AiStudio-compatible response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usageMetadata: Value,
    #[serde(default)]
    pub modelVersion: String,
    #[serde(default)]
    pub promptFeedback: Option<Value>,
}

impl GeminiResponse {
    /// Concatenated text parts of the first candidate.
    pub fn first_text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_text_joins_parts() {
        let raw = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "SELECT "}, {"text": "1"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"totalTokenCount": 7},
            "modelVersion": "gemini-2.5-flash"
        }"#;
        let resp: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.first_text().as_deref(), Some("SELECT 1"));
        assert_eq!(resp.candidates[0].finishReason, Some(FinishReason::STOP));
    }

    #[test]
    fn blocked_prompt_has_no_text() {
        let raw = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let resp: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert!(resp.first_text().is_none());
    }
}
