//! Speech-token proxy.
//!
//! The token issuance endpoint is a plain synchronous POST, so the call runs
//! on a blocking worker thread instead of the request event loop.

use std::env;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

/// Speech service configuration.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Subscription key.
    pub key: String,
    /// Service region, e.g. "eastus".
    pub region: String,
}

impl SpeechConfig {
    /// Read `AZURE_SPEECH_KEY` and `AZURE_SPEECH_REGION`; `None` when either
    /// is absent, which disables the proxy without failing startup.
    pub fn from_env() -> Option<Self> {
        let key = env::var("AZURE_SPEECH_KEY").ok()?;
        let region = env::var("AZURE_SPEECH_REGION").ok()?;
        Some(Self { key, region })
    }
}

#[derive(Debug, Serialize)]
pub struct SpeechTokenReply {
    token: String,
    region: String,
}

/// `GET /api/speech-token` - proxy one token issuance call.
pub async fn speech_token(
    State(state): State<AppState>,
) -> Result<Json<SpeechTokenReply>, ApiError> {
    let Some(config) = state.speech.clone() else {
        return Err(ApiError::Unavailable(
            "speech service is not configured".to_string(),
        ));
    };

    let region = config.region.clone();
    let token = tokio::task::spawn_blocking(move || issue_token(&config))
        .await
        .map_err(|e| ApiError::Internal(format!("token task failed: {}", e)))?
        .map_err(|e| {
            warn!(error = %e, "Speech token issuance failed");
            ApiError::Internal(e)
        })?;

    Ok(Json(SpeechTokenReply { token, region }))
}

fn issue_token(config: &SpeechConfig) -> Result<String, String> {
    let url = format!(
        "https://{}.api.cognitive.microsoft.com/sts/v1.0/issueToken",
        config.region
    );

    let client = reqwest::blocking::Client::new();
    let response = client
        .post(&url)
        .header("Ocp-Apim-Subscription-Key", &config.key)
        .header("Content-Length", "0")
        .send()
        .map_err(|e| format!("Failed to send request: {}", e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("token endpoint returned {}", status.as_u16()));
    }

    response
        .text()
        .map_err(|e| format!("Failed to read token: {}", e))
}
