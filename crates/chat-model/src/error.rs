//! Error types for chat model operations.

use thiserror::Error;

/// Errors that can occur when calling the chat-completion endpoint.
#[derive(Debug, Error)]
pub enum ChatModelError {
    /// Required configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request could not be sent or the response body not read.
    #[error("network error: {0}")]
    Network(String),

    /// The provider rejected the prompt or the completion via its
    /// content filter. Callers treat this as a moderation outcome,
    /// not as an infrastructure failure.
    #[error("content filtered by provider")]
    ContentFilter,

    /// The provider returned a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be parsed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
