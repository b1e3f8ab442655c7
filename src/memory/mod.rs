//! Conversation history compaction.
//!
//! Bounds the decision context for long conversations: recent turns are kept
//! verbatim, older turns are summarized in parallel and collapsed into one
//! synthetic message.

use crate::llm::LLMClient;
use crate::types::{ChatMessage, MessageRole};
use futures::future::join_all;

/// Histories at or below this length pass through untouched.
pub const PASSTHROUGH_LIMIT: usize = 10;

/// How many trailing messages are always kept verbatim (two turn-pairs).
pub const RECENT_MESSAGES: usize = 4;

/// Older messages are summarized in consecutive pairs.
const CHUNK_SIZE: usize = 2;

const SUMMARY_SYSTEM: &str = "\
You summarize fragments of a conversation. Produce one dense sentence or two capturing the \
facts, decisions, and open questions in the fragment. No preamble.";

/// Compact a conversation history into a bounded decision context.
///
/// Output ordering is `[summary] + recent`: recency is preserved verbatim,
/// only older context is lossy-compressed. Chunk summaries run concurrently;
/// their concatenation order is the original chunk order (oldest first).
pub async fn compact_history(llm: &dyn LLMClient, history: &[ChatMessage]) -> Vec<ChatMessage> {
    if history.len() <= PASSTHROUGH_LIMIT {
        return history.to_vec();
    }

    let split = history.len() - RECENT_MESSAGES;
    let (older, recent) = history.split_at(split);

    let summaries = join_all(older.chunks(CHUNK_SIZE).map(|chunk| summarize_chunk(llm, chunk)));

    let mut summary = String::from("Conversation summary: ");
    for (i, part) in summaries.await.into_iter().enumerate() {
        if i > 0 {
            summary.push(' ');
        }
        summary.push_str(part.trim());
    }

    let mut compacted = Vec::with_capacity(RECENT_MESSAGES + 1);
    compacted.push(ChatMessage::new(MessageRole::System, summary));
    compacted.extend_from_slice(recent);
    compacted
}

async fn summarize_chunk(llm: &dyn LLMClient, chunk: &[ChatMessage]) -> String {
    let rendered = render(chunk);
    match llm.generate_with_system(SUMMARY_SYSTEM, &rendered).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::warn!(error = %e, "chunk summarization failed, keeping truncated original");
            let mut fallback: String = rendered.chars().take(200).collect();
            if fallback.len() < rendered.len() {
                fallback.push('…');
            }
            fallback
        }
    }
}

/// Render messages as role-tagged lines for a prompt.
pub fn render(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::TextStream;
    use crate::types::{AppError, Result};
    use async_trait::async_trait;
    use serde_json::Value;

    struct EchoSummarizer {
        fail: bool,
    }

    #[async_trait]
    impl LLMClient for EchoSummarizer {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            unreachable!("compaction only uses generate_with_system")
        }

        async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
            if self.fail {
                return Err(AppError::LLM("summarizer down".to_string()));
            }
            Ok(format!("[{} chars]", prompt.len()))
        }

        async fn generate_structured(
            &self,
            _system: &str,
            _prompt: &str,
            _schema: &Value,
        ) -> Result<Value> {
            unreachable!()
        }

        async fn stream(&self, _prompt: &str) -> Result<TextStream> {
            unreachable!()
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    fn history(n: usize) -> Vec<ChatMessage> {
        (0..n)
            .map(|i| {
                let role = if i % 2 == 0 {
                    MessageRole::User
                } else {
                    MessageRole::Assistant
                };
                ChatMessage::new(role, format!("message {}", i))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_short_history_passes_through_unchanged() {
        let llm = EchoSummarizer { fail: false };
        let input = history(10);
        let output = compact_history(&llm, &input).await;
        assert_eq!(output, input);
    }

    #[tokio::test]
    async fn test_empty_history_passes_through() {
        let llm = EchoSummarizer { fail: false };
        assert!(compact_history(&llm, &[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_long_history_compacts_to_summary_plus_recent() {
        let llm = EchoSummarizer { fail: false };
        let input = history(14);
        let output = compact_history(&llm, &input).await;

        assert_eq!(output.len(), 5);
        assert_eq!(output[0].role, MessageRole::System);
        assert!(output[0].content.starts_with("Conversation summary: "));
        // The 4 recent messages are exactly the last 4 inputs in order
        assert_eq!(&output[1..], &input[10..]);
    }

    #[tokio::test]
    async fn test_summarizer_failure_degrades_to_truncated_original() {
        let llm = EchoSummarizer { fail: true };
        let input = history(12);
        let output = compact_history(&llm, &input).await;

        assert_eq!(output.len(), 5);
        // Fallback keeps raw text from the oldest chunk rather than failing
        assert!(output[0].content.contains("message 0"));
        assert_eq!(&output[1..], &input[8..]);
    }

    #[test]
    fn test_render_role_tags() {
        let messages = vec![
            ChatMessage::new(MessageRole::User, "hi"),
            ChatMessage::new(MessageRole::Assistant, "hello"),
        ];
        assert_eq!(render(&messages), "user: hi\nassistant: hello");
    }
}
