//! Streams the final report from the completed section drafts.

use crate::llm::{LLMClient, TextStream};
use crate::types::{Result, SectionResult};
use std::sync::Arc;

const REPORT_SYSTEM_PREAMBLE: &str = "\
You are a research editor assembling a final report. Combine the section drafts below into \
one polished Markdown report: keep the section order, add a title, smooth the transitions, \
remove repetition between sections, and end with a conclusion that directly answers the \
original query. Cite source URLs inline where the drafts mention them.";

pub struct ConclusionAgent {
    llm: Arc<dyn LLMClient>,
}

impl ConclusionAgent {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    /// Produce the report as a lazy, ordered stream of text chunks.
    ///
    /// The concatenation of all chunks is the final report; nothing is
    /// buffered ahead of the caller.
    pub async fn generate_report_stream(
        &self,
        query: &str,
        sections: &[SectionResult],
    ) -> Result<TextStream> {
        let mut prompt = format!(
            "{}\n\nOriginal query: {}\n\n",
            REPORT_SYSTEM_PREAMBLE, query
        );
        for section in sections {
            prompt.push_str(&format!("## {}\n\n{}\n\n", section.title, section.content));
            if !section.sources.is_empty() {
                prompt.push_str("Sources:\n");
                for source in &section.sources {
                    prompt.push_str(&format!("- {} ({})\n", source.title, source.url));
                }
                prompt.push('\n');
            }
        }

        self.llm.stream(&prompt).await
    }
}
