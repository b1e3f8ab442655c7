//! Task consumption and pipeline orchestration.
//!
//! The [`Worker`] pulls tasks off the queue under a global concurrency cap
//! and spawns one [`Pipeline`] run per task. The pipeline sequences plan,
//! parallel section refinement, and the streaming conclusion, publishing
//! progress along the way.

use crate::agents::{ConclusionAgent, PlanningAgent, ResearcherSettings, SectionResearcher};
use crate::events::{EventSink, ProgressEvent, SectionSink};
use crate::llm::{LLMClient, ModelFactory};
use crate::memory;
use crate::persistence::{ResultStore, SectionDraft};
use crate::queue::WorkQueue;
use crate::tools::ToolFactory;
use crate::types::{ResearchPlan, Result, SectionResult, Task};
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Characters of the final report included in the `completed` event.
const REPORT_PREVIEW_CHARS: usize = 200;

/// Characters of the final report the title prompt sees.
const TITLE_CONTEXT_CHARS: usize = 2000;

/// Pause after a queue-layer failure before retrying.
const QUEUE_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Executes one research task end to end: side effects only.
///
/// Every error in the run is caught at [`Pipeline::run`]'s boundary and
/// converted into a single `agent_error` event; the worker keeps serving
/// subsequent tasks.
pub struct Pipeline {
    models: Arc<dyn ModelFactory>,
    tools: Arc<dyn ToolFactory>,
    store: Arc<dyn ResultStore>,
    sink: Arc<dyn EventSink>,
    max_revisions: u32,
}

impl Pipeline {
    pub fn new(
        models: Arc<dyn ModelFactory>,
        tools: Arc<dyn ToolFactory>,
        store: Arc<dyn ResultStore>,
        sink: Arc<dyn EventSink>,
        max_revisions: u32,
    ) -> Self {
        Self {
            models,
            tools,
            store,
            sink,
            max_revisions,
        }
    }

    /// Run one task to completion. Never returns an error: failures become
    /// one terminal `agent_error` event bearing the task identifiers.
    pub async fn run(&self, task: Task) {
        tracing::info!(request_id = %task.request_id, query = %task.query, "task received");

        if let Err(e) = self.execute(&task).await {
            tracing::error!(request_id = %task.request_id, error = %e, "task failed");
            self.sink
                .emit(ProgressEvent::error(
                    &task.user_id,
                    format!("Execution failed: {}", e),
                    &task.request_id,
                ))
                .await;
        }
    }

    async fn execute(&self, task: &Task) -> Result<()> {
        // Model construction failure is fatal to this one task
        let llm = self.models.create(&task.config)?;
        let tools = self.tools.create(&task.config);

        // 1. Decision context, bounded regardless of history length
        let context = memory::compact_history(llm.as_ref(), &task.history).await;

        // 2. Plan
        self.sink
            .emit(ProgressEvent::update(
                &task.user_id,
                "Planner",
                "thinking",
                "Analyzing query and generating plan...",
                json!({"requestId": task.request_id}),
            ))
            .await;

        let planner = PlanningAgent::new(llm.clone());
        let plan = planner.generate_plan(&task.query, &context).await?;

        let toc: Vec<&str> = plan.sections.iter().map(|s| s.title.as_str()).collect();
        self.sink
            .emit(ProgressEvent::update(
                &task.user_id,
                "Planner",
                "action",
                "Research plan created.",
                json!({
                    "requestId": task.request_id,
                    "event_type": "plan_created",
                    "toc": toc,
                    "full_plan": plan,
                }),
            ))
            .await;
        tracing::info!(request_id = %task.request_id, sections = plan.sections.len(), "plan created");

        // 3-4. Fan out across sections, fan in preserving plan order
        let sections = self.run_sections(task, llm.clone(), tools, &plan).await?;

        // 5. Streaming conclusion
        let report = self.run_conclusion(task, llm.clone(), &sections).await?;

        // 6. Final persistence and best-effort title
        if let Some(chat_id) = &task.chat_id {
            if let Err(e) = self.store.save_final(chat_id, &report).await {
                tracing::warn!(request_id = %task.request_id, error = %e, "failed to save final report");
            } else {
                tracing::info!(request_id = %task.request_id, chat_id = %chat_id, "final report saved");
            }
            self.generate_title(task, llm.as_ref(), chat_id, &report).await;
        } else {
            tracing::warn!(request_id = %task.request_id, "no chatId in task, final report not saved");
        }

        // 7. Terminal event with a bounded preview
        let preview: String = report.chars().take(REPORT_PREVIEW_CHARS).collect();
        self.sink
            .emit(ProgressEvent::update(
                &task.user_id,
                "Worker",
                "output",
                "Research completed.",
                json!({
                    "requestId": task.request_id,
                    "event_type": "completed",
                    "report_preview": format!("{}...", preview),
                }),
            ))
            .await;

        Ok(())
    }

    /// Run every section in parallel; results come back in plan order no
    /// matter which section finishes first.
    async fn run_sections(
        &self,
        task: &Task,
        llm: Arc<dyn LLMClient>,
        tools: Arc<dyn crate::tools::ResearchTools>,
        plan: &ResearchPlan,
    ) -> Result<Vec<SectionResult>> {
        let settings = ResearcherSettings {
            max_revisions: self.max_revisions,
            include_illustrations: task.config.include_illustrations,
            ..Default::default()
        };

        let section_runs = plan.sections.iter().enumerate().map(|(index, section)| {
            let llm = llm.clone();
            let tools = tools.clone();
            async move {
                self.sink
                    .emit(ProgressEvent::update(
                        &task.user_id,
                        "Researcher",
                        "action",
                        format!("Starting research for: {}", section.title),
                        json!({
                            "requestId": task.request_id,
                            "event_type": "research_started",
                            "section_index": index,
                            "topic": section.title,
                        }),
                    ))
                    .await;

                let sink = SectionSink::new(
                    self.sink.clone(),
                    &task.user_id,
                    &task.request_id,
                    index,
                    &section.title,
                );
                let researcher = SectionResearcher::new(llm, tools, sink, settings);
                let result = researcher.run(&section.title, &section.description).await?;

                // Persist each draft the moment its section completes
                let draft = SectionDraft::draft(
                    &result.title,
                    &result.content,
                    result.sources.clone(),
                    result.illustration.clone(),
                );
                if let Err(e) = self.store.save_intermediate(&task.request_id, &draft).await {
                    tracing::warn!(
                        request_id = %task.request_id,
                        section = %result.title,
                        error = %e,
                        "failed to save intermediate result"
                    );
                }

                Ok::<SectionResult, crate::types::AppError>(result)
            }
        });

        // try_join_all keeps input order, so fan-in order == plan order
        futures::future::try_join_all(section_runs).await
    }

    async fn run_conclusion(
        &self,
        task: &Task,
        llm: Arc<dyn LLMClient>,
        sections: &[SectionResult],
    ) -> Result<String> {
        self.sink
            .emit(ProgressEvent::update(
                &task.user_id,
                "Conclusion",
                "thinking",
                "Aggregating findings and writing final report...",
                json!({"requestId": task.request_id}),
            ))
            .await;

        let agent = ConclusionAgent::new(llm);
        let mut stream = agent.generate_report_stream(&task.query, sections).await?;

        let mut report = String::new();
        let mut chunk_index = 0u32;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            report.push_str(&chunk);
            // Each chunk is surfaced before aggregation proceeds
            self.sink
                .emit(ProgressEvent::update(
                    &task.user_id,
                    "Conclusion",
                    "output",
                    "Generating report...",
                    json!({
                        "requestId": task.request_id,
                        "event_type": "report_chunk",
                        "chunk": chunk,
                        "chunk_index": chunk_index,
                    }),
                ))
                .await;
            chunk_index += 1;
        }

        Ok(report)
    }

    /// Best-effort: a title failure is logged and the task still succeeds.
    async fn generate_title(&self, task: &Task, llm: &dyn LLMClient, chat_id: &str, report: &str) {
        let excerpt: String = report.chars().take(TITLE_CONTEXT_CHARS).collect();
        let prompt = format!(
            "Generate a very short, concise title (max 6 words) for this research report. \
             Do not use quotes:\n\n{}",
            excerpt
        );

        match llm.generate(&prompt).await {
            Ok(raw) => {
                let title = raw.trim().replace('"', "");
                self.sink
                    .emit(ProgressEvent::update(
                        &task.user_id,
                        "Worker",
                        "output",
                        "Title generated.",
                        json!({
                            "requestId": task.request_id,
                            "event_type": "title_generated",
                            "title": title,
                            "chatId": chat_id,
                        }),
                    ))
                    .await;
            }
            Err(e) => {
                tracing::warn!(request_id = %task.request_id, error = %e, "failed to generate title");
            }
        }
    }
}

/// The queue consumer: bounds in-flight pipelines with a counting semaphore.
///
/// A permit is acquired before blocking on the queue and travels into the
/// spawned pipeline task, so it is released on every exit path - success,
/// task error, or panic - and the semaphore can never leak.
pub struct Worker {
    queue: Arc<dyn WorkQueue>,
    pipeline: Arc<Pipeline>,
    semaphore: Arc<Semaphore>,
}

impl Worker {
    pub fn new(queue: Arc<dyn WorkQueue>, pipeline: Arc<Pipeline>, max_concurrent: usize) -> Self {
        Self {
            queue,
            pipeline,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Consume tasks forever. Queue-layer failures are logged and retried
    /// after a short backoff; they never crash the process.
    pub async fn run(&self) {
        loop {
            let Ok(permit) = self.semaphore.clone().acquire_owned().await else {
                // Semaphore closed: shutting down
                return;
            };

            match self.queue.pop().await {
                Ok(Some(task)) => {
                    let pipeline = self.pipeline.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        pipeline.run(task).await;
                    });
                }
                Ok(None) => {
                    drop(permit);
                }
                Err(e) => {
                    drop(permit);
                    tracing::error!(error = %e, "queue error, backing off");
                    tokio::time::sleep(QUEUE_RETRY_BACKOFF).await;
                }
            }
        }
    }

    /// Currently available permits; in-flight pipelines hold the rest.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}
