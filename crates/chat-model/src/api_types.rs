//! Request and response types for the chat-completions endpoint.

use serde::{Deserialize, Serialize};

/// A chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant"
    pub role: String,
    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    /// Conversation messages, system prompt first.
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum completion tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Chat completion response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    /// Completion choices; the first one carries the answer.
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

/// A single completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    /// The assistant message.
    pub message: ChoiceMessage,
    /// Why generation stopped ("stop", "length", "content_filter", ...).
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The message inside a completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    /// Message content; absent when the completion was filtered.
    #[serde(default)]
    pub content: Option<String>,
}

/// Error envelope returned by the provider on non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// The error detail.
    pub error: ApiErrorDetail,
}

/// Provider error detail.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code, e.g. "content_filter".
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

impl ApiErrorBody {
    /// True when the provider rejected the request through its content filter.
    pub fn is_content_filter(&self) -> bool {
        matches!(self.error.code.as_deref(), Some("content_filter"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_filter_detection() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"error": {"code": "content_filter", "message": "The prompt was filtered."}}"#,
        )
        .unwrap();
        assert!(body.is_content_filter());

        let body: ApiErrorBody = serde_json::from_str(
            r#"{"error": {"code": "429", "message": "Rate limit exceeded."}}"#,
        )
        .unwrap();
        assert!(!body.is_content_filter());
    }

    #[test]
    fn test_parse_completion_response() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "Hola"}, "finish_reason": "stop"}]}"#,
        )
        .unwrap();
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("Hola")
        );
    }
}
