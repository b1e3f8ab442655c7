//! Turns a query plus compacted conversation context into an ordered plan.

use crate::llm::{self, LLMClient};
use crate::memory;
use crate::types::{AppError, ChatMessage, ResearchPlan, Result};
use std::sync::Arc;

const PLANNER_SYSTEM: &str = "\
You are an expert research planner. Given a user query, create a detailed table of contents \
for a comprehensive research report. The plan should be logical, cover all aspects of the \
query, and include an introduction and a conclusion section. Use any conversation context \
only to disambiguate the query.";

pub struct PlanningAgent {
    llm: Arc<dyn LLMClient>,
}

impl PlanningAgent {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    /// Generate the report plan. An empty plan is treated as a model failure;
    /// every task needs at least one section to research.
    pub async fn generate_plan(
        &self,
        query: &str,
        context: &[ChatMessage],
    ) -> Result<ResearchPlan> {
        let prompt = if context.is_empty() {
            query.to_string()
        } else {
            format!(
                "Conversation context:\n{}\n\nResearch query: {}",
                memory::render(context),
                query
            )
        };

        let plan: ResearchPlan = llm::structured(self.llm.as_ref(), PLANNER_SYSTEM, &prompt).await?;
        if plan.sections.is_empty() {
            return Err(AppError::LLM("planner returned an empty plan".to_string()));
        }
        Ok(plan)
    }
}
