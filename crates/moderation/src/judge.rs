//! LLM-as-judge moderation layer.
//!
//! Third layer: a second-opinion classification from the chat model itself,
//! under a fixed rubric that asks for exactly SAFE or UNSAFE. Catches the
//! nuanced cases (dog-whistles, context-dependent insults) the cheaper layers
//! miss. Fail-open: if the call errors the judge is skipped.

use std::sync::Arc;

use chat_model::ChatModelClient;
use tracing::{debug, warn};

use crate::verdict::{Verdict, SEVERITY_GENERIC};

/// Rubric the judge answers under.
const JUDGE_RUBRIC: &str = "\
You are a strict content moderator for a civic assistant. Classify the user \
message and answer with exactly one word: SAFE or UNSAFE.

Answer UNSAFE for:
- discrimination of any kind (racial, gender, religious, class)
- personal insults or harassment
- anti-democratic statements or incitement

Answer SAFE for:
- respectful political opinions
- factual or legal questions
- constructive criticism of government services

Answer with SAFE or UNSAFE only.";

/// Second-opinion moderation judge backed by the chat model.
pub struct LlmJudge {
    client: Arc<ChatModelClient>,
}

impl LlmJudge {
    /// Create a judge sharing the given chat-model client.
    pub fn new(client: Arc<ChatModelClient>) -> Self {
        Self { client }
    }

    /// Ask the model for a SAFE/UNSAFE verdict on the text.
    ///
    /// Flagged iff the verdict text contains "UNSAFE" anywhere; extra tokens
    /// around the word are tolerated. Call failures fail open.
    pub async fn review(&self, text: &str) -> Verdict {
        match self.client.complete(JUDGE_RUBRIC, text).await {
            Ok(answer) => {
                debug!(verdict = %answer.trim(), "Judge verdict");
                verdict_from_text(&answer)
            }
            Err(err) => {
                warn!(error = %err, "Judge call failed, failing open");
                Verdict::clean("judge skipped")
            }
        }
    }
}

/// Map the judge's raw answer to a verdict.
fn verdict_from_text(answer: &str) -> Verdict {
    if answer.contains("UNSAFE") {
        Verdict::flagged(SEVERITY_GENERIC, "Judged UNSAFE by model review")
    } else {
        Verdict::clean("judged safe")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsafe_verdict_flags() {
        assert!(verdict_from_text("UNSAFE").flagged);
    }

    #[test]
    fn test_unsafe_with_extra_tokens_flags() {
        assert!(verdict_from_text("The message is UNSAFE because it insults.").flagged);
    }

    #[test]
    fn test_safe_verdict_passes() {
        assert!(!verdict_from_text("SAFE").flagged);
    }
}
