//! Per-section iterative refinement engine.
//!
//! Runs the gap-check / act / synthesize loop for one section to completion:
//!
//! ```text
//! CHECK_GAPS -> { ACT -> SYNTHESIZE -> CHECK_GAPS }* -> ILLUSTRATE -> DONE
//! ```
//!
//! The loop is bounded by a hard revision cap enforced here, independent of
//! anything the model reports: each iteration that issues actions consumes
//! one revision, and once the cap is hit the gap check returns no actions no
//! matter what. The cap is handed to the gap check by value so no shared
//! mutable state is involved.

use crate::events::SectionSink;
use crate::llm::{self, LLMClient};
use crate::tools::{IllustrationTool, ResearchTools};
use crate::types::{
    Action, ActionTool, GapAnalysis, Illustration, Result, RetrievalResult, SectionResult,
};
use serde_json::json;
use std::sync::Arc;

const GAP_SYSTEM: &str = "\
You are a research supervisor. Analyze the current draft of a report section. If more \
information is needed, decide whether to SEARCH the web or CRAWL a specific URL you have \
already seen.";

const SYNTHESIS_SYSTEM: &str = "\
You are a research writer. Incorporate the new information into the draft. Ensure the draft \
covers the topic and description comprehensively. Write in Markdown.";

/// Length cap for the default first-pass search query.
const DEFAULT_QUERY_CHARS: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct ResearcherSettings {
    /// Hard upper bound on refinement iterations per section
    pub max_revisions: u32,
    /// Results requested per search action
    pub search_top_k: usize,
    /// Whether the illustration stage runs after refinement
    pub include_illustrations: bool,
}

impl Default for ResearcherSettings {
    fn default() -> Self {
        Self {
            max_revisions: 3,
            search_top_k: 3,
            include_illustrations: true,
        }
    }
}

/// Refinement engine for a single section. Owns the section's draft and
/// accumulated sources exclusively; nothing here is shared across sections.
pub struct SectionResearcher {
    llm: Arc<dyn LLMClient>,
    tools: Arc<dyn ResearchTools>,
    sink: SectionSink,
    settings: ResearcherSettings,
}

impl SectionResearcher {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        tools: Arc<dyn ResearchTools>,
        sink: SectionSink,
        settings: ResearcherSettings,
    ) -> Self {
        Self {
            llm,
            tools,
            sink,
            settings,
        }
    }

    /// Run the section to completion and return its draft, sources, and
    /// optional illustration.
    pub async fn run(&self, topic: &str, description: &str) -> Result<SectionResult> {
        let mut draft = String::new();
        let mut sources: Vec<RetrievalResult> = Vec::new();
        let mut revision: u32 = 0;

        loop {
            let actions = self.check_gaps(topic, description, &draft, revision).await;
            if actions.is_empty() {
                break;
            }
            revision += 1;

            self.act(&actions, &mut sources).await;
            draft = self.synthesize(topic, description, &draft, &sources).await?;
        }

        let illustration = if self.settings.include_illustrations {
            self.illustrate(topic, description).await
        } else {
            None
        };

        Ok(SectionResult {
            title: topic.to_string(),
            content: draft,
            sources,
            illustration,
        })
    }

    /// Decide whether the draft is complete and which actions would close the
    /// gap. Returns no actions to terminate the loop.
    async fn check_gaps(
        &self,
        topic: &str,
        description: &str,
        draft: &str,
        revision: u32,
    ) -> Vec<Action> {
        // Hard termination guarantee, regardless of what the model thinks
        if revision >= self.settings.max_revisions {
            return Vec::new();
        }

        // First pass: no draft yet, seed with one default search
        if draft.is_empty() {
            self.sink
                .emit("gap_detected", json!({"reason": "Starting initial research"}))
                .await;
            let query: String = format!("{} {}", topic, description)
                .chars()
                .take(DEFAULT_QUERY_CHARS)
                .collect();
            return vec![Action {
                tool: ActionTool::Search,
                target: query,
            }];
        }

        let prompt = format!(
            "Topic: {}\nDescription: {}\n\nCurrent Draft:\n{}\n\n\
             Is this complete? If not, what actions should we take?",
            topic, description, draft
        );

        match llm::structured::<GapAnalysis>(self.llm.as_ref(), GAP_SYSTEM, &prompt).await {
            Ok(analysis) if analysis.is_complete => Vec::new(),
            Ok(analysis) => {
                self.sink
                    .emit("gap_detected", json!({"reason": analysis.missing_info}))
                    .await;
                analysis.actions
            }
            Err(e) => {
                // Degrade this iteration: terminate the loop with the draft
                // we have rather than failing the section
                tracing::warn!(topic, error = %e, "gap analysis failed, finishing section");
                Vec::new()
            }
        }
    }

    /// Execute every pending action in order, appending whatever was found.
    /// Tool failures yield nothing; they never abort the section.
    async fn act(&self, actions: &[Action], sources: &mut Vec<RetrievalResult>) {
        for action in actions {
            self.sink
                .emit(
                    "tool_start",
                    json!({"tool": action.tool, "query": action.target}),
                )
                .await;

            match action.tool {
                ActionTool::Search => {
                    let found = match self.tools.search(&action.target, self.settings.search_top_k).await
                    {
                        Ok(found) => found,
                        Err(e) => {
                            tracing::warn!(query = %action.target, error = %e, "search failed");
                            Vec::new()
                        }
                    };
                    for item in &found {
                        self.sink
                            .emit(
                                "source_found",
                                json!({"title": item.title, "url": item.url}),
                            )
                            .await;
                    }
                    sources.extend(found);
                }
                ActionTool::Crawl => {
                    let content = match self.tools.crawl(&action.target).await {
                        Ok(content) => content,
                        Err(e) => {
                            tracing::warn!(url = %action.target, error = %e, "crawl failed");
                            String::new()
                        }
                    };
                    let title = format!("Crawl: {}", action.target);
                    self.sink
                        .emit("source_found", json!({"title": title, "url": action.target}))
                        .await;
                    sources.push(RetrievalResult {
                        title,
                        url: action.target.clone(),
                        content,
                    });
                }
            }
        }
    }

    /// Rewrite the draft incorporating everything accumulated so far.
    /// Failure here is fatal to the task; there is no sensible fallback draft.
    async fn synthesize(
        &self,
        topic: &str,
        description: &str,
        draft: &str,
        sources: &[RetrievalResult],
    ) -> Result<String> {
        let mut context = String::new();
        for (i, source) in sources.iter().enumerate() {
            context.push_str(&format!(
                "Source {}: {}\nURL: {}\nContent: {}\n\n",
                i + 1,
                source.title,
                source.url,
                source.content
            ));
        }

        let prompt = format!(
            "Topic: {}\nDescription: {}\n\nExisting Draft:\n{}\n\n\
             New Research Materials:\n{}\nWrite the updated draft (Markdown):",
            topic, description, draft, context
        );

        self.llm.generate_with_system(SYNTHESIS_SYSTEM, &prompt).await
    }

    /// Illustration failure degrades to no illustration.
    async fn illustrate(&self, topic: &str, description: &str) -> Option<Illustration> {
        let tool = IllustrationTool::new(self.llm.clone());
        match tool.illustrate(topic, description).await {
            Ok(illustration) => illustration,
            Err(e) => {
                tracing::warn!(topic, error = %e, "illustration failed, continuing without one");
                None
            }
        }
    }
}
