//! HTTP client for the chat-completions endpoint.

use reqwest::Client;
use tracing::{debug, warn};

use crate::api_types::{
    ApiErrorBody, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
};
use crate::config::ChatModelConfig;
use crate::error::ChatModelError;

/// Client for a deployment-scoped chat-completions endpoint.
///
/// The client is cheap to clone through an `Arc` and holds no mutable
/// state; one instance is shared across all request handlers.
pub struct ChatModelClient {
    client: Client,
    config: ChatModelConfig,
}

impl ChatModelClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ChatModelConfig) -> Result<Self, ChatModelError> {
        if config.endpoint.is_empty() {
            return Err(ChatModelError::Configuration(
                "chat model endpoint is empty".to_string(),
            ));
        }

        let client = Client::builder().build().map_err(|e| {
            ChatModelError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self { client, config })
    }

    /// Create a client from environment variables.
    ///
    /// See [`ChatModelConfig::from_env`] for the variables read.
    pub fn from_env() -> Result<Self, ChatModelError> {
        Self::new(ChatModelConfig::from_env()?)
    }

    /// Get the configuration.
    pub fn config(&self) -> &ChatModelConfig {
        &self.config
    }

    /// Run a single-turn completion with a system prompt and one user message.
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_text: &str,
    ) -> Result<String, ChatModelError> {
        self.complete_messages(vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(user_text),
        ])
        .await
    }

    /// Run a completion over an explicit message list.
    pub async fn complete_messages(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<String, ChatModelError> {
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint, self.config.deployment, self.config.api_version
        );

        let request = ChatCompletionRequest {
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(deployment = %self.config.deployment, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatModelError::Network(format!("Failed to send request: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(body) = serde_json::from_str::<ApiErrorBody>(&error_text) {
                if body.is_content_filter() {
                    return Err(ChatModelError::ContentFilter);
                }
                return Err(ChatModelError::Api {
                    status: status.as_u16(),
                    message: body.error.message,
                });
            }

            return Err(ChatModelError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatModelError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatModelError::InvalidResponse("no choices in response".to_string()))?;

        // A 200 can still carry a filtered completion.
        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(ChatModelError::ContentFilter);
        }

        match choice.message.content {
            Some(content) => Ok(content),
            None => {
                warn!("No content in completion choice");
                Err(ChatModelError::InvalidResponse(
                    "empty completion content".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_endpoint() {
        let result = ChatModelClient::new(ChatModelConfig::default());
        assert!(matches!(result, Err(ChatModelError::Configuration(_))));
    }

    #[test]
    fn test_new_accepts_configured_endpoint() {
        let config = ChatModelConfig {
            endpoint: "https://example.openai.azure.com".to_string(),
            api_key: "test-key".to_string(),
            ..ChatModelConfig::default()
        };
        assert!(ChatModelClient::new(config).is_ok());
    }
}
