//! Chat-completion client for the Azure OpenAI service.
//!
//! This crate wraps the deployment-scoped chat-completions endpoint used by
//! Civic Knit. It exposes:
//!
//! - [`ChatModelClient`] - The HTTP client for completions
//! - [`ChatModelConfig`] - Endpoint/key/deployment configuration
//! - [`ChatModelError`] - Error taxonomy, including provider content-filter
//!   rejections as a distinct variant
//!
//! # Example
//!
//! ```no_run
//! use chat_model::{ChatModelClient, ChatModelConfig};
//!
//! # async fn example() -> Result<(), chat_model::ChatModelError> {
//! let client = ChatModelClient::new(ChatModelConfig::from_env()?)?;
//! let answer = client.complete("You are a helpful assistant.", "Hello!").await?;
//! println!("{}", answer);
//! # Ok(())
//! # }
//! ```

mod api_types;
mod client;
mod config;
mod error;

pub use api_types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
pub use client::ChatModelClient;
pub use config::ChatModelConfig;
pub use error::ChatModelError;
