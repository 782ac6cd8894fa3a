//! External content-safety classifier.
//!
//! Second moderation layer: one POST to the text-analysis endpoint of the
//! content-safety service, requesting per-category severities. The layer is
//! strictly fail-open: missing configuration or a provider error yields a
//! not-flagged verdict with a sentinel reason, never an error.

use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::verdict::Verdict;

/// Sentinel reason when the classifier has no endpoint/key configured.
pub const REASON_DISABLED: &str = "disabled";

/// Sentinel reason when the classifier call failed.
pub const REASON_API_ERROR: &str = "api error";

/// Default API version for the text-analysis endpoint.
const DEFAULT_API_VERSION: &str = "2024-09-01";

/// Categories requested from the classifier.
const CATEGORIES: &[&str] = &["Hate", "SelfHarm", "Sexual", "Violence"];

/// Configuration for the content-safety endpoint.
#[derive(Debug, Clone)]
pub struct SafetyConfig {
    /// Service endpoint, e.g. `https://example.cognitiveservices.azure.com`.
    pub endpoint: String,
    /// Subscription key.
    pub api_key: String,
    /// API version query parameter.
    pub api_version: String,
}

impl SafetyConfig {
    /// Read configuration from the environment.
    ///
    /// Returns `None` when `CONTENT_SAFETY_ENDPOINT` or `CONTENT_SAFETY_KEY`
    /// is absent; the classifier then runs disabled. Optional:
    /// `CONTENT_SAFETY_API_VERSION` (default: 2024-09-01).
    pub fn from_env() -> Option<Self> {
        let endpoint = env::var("CONTENT_SAFETY_ENDPOINT").ok()?;
        let api_key = env::var("CONTENT_SAFETY_KEY").ok()?;
        let api_version =
            env::var("CONTENT_SAFETY_API_VERSION").unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());

        Some(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            api_version,
        })
    }
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
    categories: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(rename = "categoriesAnalysis", default)]
    categories_analysis: Vec<CategoryAnalysis>,
}

#[derive(Debug, Deserialize)]
struct CategoryAnalysis {
    category: String,
    #[serde(default)]
    severity: u8,
}

/// Client for the content-safety text-analysis endpoint.
pub struct SafetyClassifier {
    client: Client,
    config: Option<SafetyConfig>,
}

impl SafetyClassifier {
    /// Create a classifier; `None` config means disabled.
    pub fn new(config: Option<SafetyConfig>) -> Self {
        match &config {
            Some(config) => info!(endpoint = %config.endpoint, "Content-safety classifier enabled"),
            None => info!("Content-safety classifier disabled (no endpoint/key configured)"),
        }

        Self {
            client: Client::new(),
            config,
        }
    }

    /// Create a classifier from environment variables.
    pub fn from_env() -> Self {
        Self::new(SafetyConfig::from_env())
    }

    /// Whether the classifier has an endpoint configured.
    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Analyze text and return a verdict.
    ///
    /// Flagged iff any category severity exceeds zero; overall severity is
    /// the maximum across categories. Never returns an error: unconfigured
    /// and failed calls both degrade to a not-flagged sentinel verdict.
    pub async fn analyze(&self, text: &str) -> Verdict {
        let Some(config) = &self.config else {
            return Verdict::clean(REASON_DISABLED);
        };

        match self.call(config, text).await {
            Ok(analysis) => {
                let severity = analysis
                    .categories_analysis
                    .iter()
                    .map(|c| c.severity)
                    .max()
                    .unwrap_or(0);

                let reason = analysis
                    .categories_analysis
                    .iter()
                    .map(|c| format!("{}={}", c.category, c.severity))
                    .collect::<Vec<_>>()
                    .join(", ");

                if severity > 0 {
                    Verdict::flagged(severity, reason)
                } else {
                    Verdict::clean(reason)
                }
            }
            Err(err) => {
                warn!(error = %err, "Content-safety call failed, failing open");
                Verdict::clean(REASON_API_ERROR)
            }
        }
    }

    async fn call(&self, config: &SafetyConfig, text: &str) -> Result<AnalyzeResponse, String> {
        let url = format!(
            "{}/contentsafety/text:analyze?api-version={}",
            config.endpoint, config.api_version
        );

        let request = AnalyzeRequest {
            text,
            categories: CATEGORIES,
        };

        let response = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &config.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Failed to send request: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("API error ({}): {}", status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_classifier_never_flags() {
        let classifier = SafetyClassifier::new(None);
        assert!(!classifier.is_enabled());

        let verdict = classifier.analyze("anything at all").await;
        assert!(!verdict.flagged);
        assert_eq!(verdict.reason, REASON_DISABLED);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_open() {
        let classifier = SafetyClassifier::new(Some(SafetyConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            api_key: "test-key".to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }));

        let verdict = classifier.analyze("anything at all").await;
        assert!(!verdict.flagged);
        assert_eq!(verdict.reason, REASON_API_ERROR);
    }

    #[test]
    fn test_parse_analysis_response() {
        let parsed: AnalyzeResponse = serde_json::from_str(
            r#"{"categoriesAnalysis": [
                {"category": "Hate", "severity": 0},
                {"category": "Violence", "severity": 3}
            ]}"#,
        )
        .unwrap();

        let max = parsed.categories_analysis.iter().map(|c| c.severity).max();
        assert_eq!(max, Some(3));
    }
}
