//! Shared application state injected into request handlers.

use std::sync::Arc;

use chat_model::ChatModelClient;
use docstore::Store;
use moderation::ModerationPipeline;

use crate::auth::AuthConfig;
use crate::speech::SpeechConfig;

/// Process-wide state: constructed once in `main`, cloned per request.
///
/// Everything here is read-only after startup; handlers only invoke
/// operations against the shared clients.
#[derive(Clone)]
pub struct AppState {
    /// Document store handle.
    pub store: Store,
    /// Chat-model client, shared with the moderation judge.
    pub chat_model: Arc<ChatModelClient>,
    /// Three-stage moderation pipeline.
    pub moderation: Arc<ModerationPipeline>,
    /// Identity-provider configuration; `None` disables login.
    pub auth: Option<Arc<AuthConfig>>,
    /// Speech-token issuance configuration; `None` disables the proxy.
    pub speech: Option<SpeechConfig>,
    /// Outbound HTTP client for the token exchange.
    pub http: reqwest::Client,
}
