//! Configuration for the chat-completion client.

use std::env;

use crate::error::ChatModelError;

/// Default API version for the chat-completions endpoint.
pub const DEFAULT_API_VERSION: &str = "2024-06-01";

/// Configuration for [`crate::ChatModelClient`].
#[derive(Debug, Clone)]
pub struct ChatModelConfig {
    /// Service endpoint, e.g. `https://example.openai.azure.com`.
    pub endpoint: String,

    /// API key for authentication.
    pub api_key: String,

    /// Deployment name of the chat model.
    pub deployment: String,

    /// API version query parameter.
    pub api_version: String,

    /// Temperature for generation (0.0 - 2.0).
    pub temperature: Option<f32>,

    /// Maximum tokens for the completion.
    pub max_tokens: Option<u32>,
}

impl Default for ChatModelConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            deployment: "gpt-4".to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            temperature: Some(0.7),
            max_tokens: Some(800),
        }
    }
}

impl ChatModelConfig {
    /// Create configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `AZURE_OPENAI_ENDPOINT` - Service endpoint
    /// - `AZURE_OPENAI_KEY` - API key
    /// - `AZURE_DEPLOYMENT_NAME` - Chat model deployment name
    ///
    /// Optional environment variables:
    /// - `AZURE_OPENAI_API_VERSION` - API version (default: 2024-06-01)
    /// - `AZURE_OPENAI_TEMPERATURE` - Temperature (default: 0.7)
    /// - `AZURE_OPENAI_MAX_TOKENS` - Max completion tokens (default: 800)
    pub fn from_env() -> Result<Self, ChatModelError> {
        let endpoint = env::var("AZURE_OPENAI_ENDPOINT")
            .map_err(|_| ChatModelError::Configuration("AZURE_OPENAI_ENDPOINT not set".to_string()))?;

        let api_key = env::var("AZURE_OPENAI_KEY")
            .map_err(|_| ChatModelError::Configuration("AZURE_OPENAI_KEY not set".to_string()))?;

        let deployment = env::var("AZURE_DEPLOYMENT_NAME")
            .map_err(|_| ChatModelError::Configuration("AZURE_DEPLOYMENT_NAME not set".to_string()))?;

        let api_version = env::var("AZURE_OPENAI_API_VERSION")
            .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());

        let temperature = env::var("AZURE_OPENAI_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(Some(0.7));

        let max_tokens = env::var("AZURE_OPENAI_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(Some(800));

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            deployment,
            api_version,
            temperature,
            max_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChatModelConfig::default();
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.temperature, Some(0.7));
    }
}
