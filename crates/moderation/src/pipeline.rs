//! The combined moderation pipeline.

use std::sync::Arc;

use chat_model::ChatModelClient;
use tracing::debug;

use crate::judge::LlmJudge;
use crate::keyword;
use crate::safety::SafetyClassifier;
use crate::verdict::Verdict;

/// Three moderation layers run in cost order with short-circuiting.
///
/// Keyword filter first (free), then the external classifier, then the LLM
/// judge. Once a layer flags, later layers never run, so flagged input never
/// pays for an API call it does not need.
pub struct ModerationPipeline {
    safety: SafetyClassifier,
    judge: LlmJudge,
}

impl ModerationPipeline {
    /// Build a pipeline around the shared chat-model client.
    pub fn new(safety: SafetyClassifier, chat_client: Arc<ChatModelClient>) -> Self {
        Self {
            safety,
            judge: LlmJudge::new(chat_client),
        }
    }

    /// Run all layers over the text, returning the first flagging verdict
    /// or a clean verdict when every layer passes.
    pub async fn check(&self, text: &str) -> Verdict {
        let verdict = keyword::check(text);
        if verdict.flagged {
            debug!(reason = %verdict.reason, "Blocked by keyword filter");
            return verdict;
        }

        let verdict = self.safety.analyze(text).await;
        if verdict.flagged {
            debug!(reason = %verdict.reason, "Blocked by safety classifier");
            return verdict;
        }

        let verdict = self.judge.review(text).await;
        if verdict.flagged {
            debug!(reason = %verdict.reason, "Blocked by model judge");
            return verdict;
        }

        Verdict::clean("all layers passed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_model::ChatModelConfig;

    fn unreachable_pipeline() -> ModerationPipeline {
        // Endpoint that refuses connections immediately; exercises the
        // fail-open paths without real network traffic.
        let config = ChatModelConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            api_key: "test-key".to_string(),
            ..ChatModelConfig::default()
        };
        let client = Arc::new(ChatModelClient::new(config).unwrap());
        ModerationPipeline::new(SafetyClassifier::new(None), client)
    }

    #[tokio::test]
    async fn test_keyword_flag_short_circuits_before_any_call() {
        let pipeline = unreachable_pipeline();
        let verdict = pipeline.check("I hate bureaucrats").await;

        assert!(verdict.flagged);
        assert_eq!(verdict.severity, 1);
        assert!(verdict.reason.contains("hate"));
    }

    #[tokio::test]
    async fn test_clean_text_with_disabled_layers_passes() {
        let pipeline = unreachable_pipeline();
        // Classifier disabled, judge unreachable (fails open).
        let verdict = pipeline.check("How do I renew my driver's license?").await;

        assert!(!verdict.flagged);
        assert_eq!(verdict.severity, 0);
    }
}
