//! Mock implementations for testing.
//!
//! This module provides mock LLM clients, tools, sinks, stores, and queues
//! that can be used across different test files without duplication. All of
//! them are in-memory and deterministic except where a test configures an
//! explicit delay.
#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use prism::events::{EventKind, EventSink, ProgressEvent};
use prism::llm::{LLMClient, ModelFactory, TextStream};
use prism::persistence::{ResultStore, SectionDraft};
use prism::queue::WorkQueue;
use prism::tools::{ResearchTools, ToolFactory};
use prism::types::{AppError, Result, RetrievalResult, Task, TaskConfig};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the mock client answers gap-analysis requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapMode {
    /// Every draft is judged complete on first review.
    Complete,
    /// No draft is ever complete: one follow-up search per review.
    Incomplete,
    /// Gap analysis itself errors.
    Failing,
}

/// How the mock client answers illustration-need requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllustrationMode {
    /// No section warrants a visual aid.
    Decline,
    /// Every section gets a mermaid illustration.
    Approve,
    /// The need check itself errors.
    Failing,
}

/// Mock LLM client with scripted responses for every pipeline stage.
///
/// Structured requests are routed by schema shape: a schema asking for
/// `sections` gets the configured plan, `is_complete` gets the gap answer,
/// `needs_illustration` follows the illustration mode. Plain generation
/// returns the configured synthesis text, and streaming replays the
/// configured chunks while recording the prompt it was given.
pub struct MockLLMClient {
    plan: Value,
    gap_mode: GapMode,
    illustration_mode: IllustrationMode,
    synthesis: String,
    chunks: Vec<String>,
    chunk_delay: Duration,
    fail_structured: bool,
    stream_prompts: Mutex<Vec<String>>,
}

impl MockLLMClient {
    /// Two-section plan, first-pass-complete gaps, two report chunks.
    pub fn new() -> Self {
        Self {
            plan: json!({
                "sections": [
                    {"title": "Alpha", "description": "The first aspect"},
                    {"title": "Beta", "description": "The second aspect"},
                ]
            }),
            gap_mode: GapMode::Complete,
            illustration_mode: IllustrationMode::Decline,
            synthesis: "Draft content.".to_string(),
            chunks: vec!["Hello ".to_string(), "world".to_string()],
            chunk_delay: Duration::ZERO,
            fail_structured: false,
            stream_prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_gap_mode(mut self, mode: GapMode) -> Self {
        self.gap_mode = mode;
        self
    }

    pub fn with_illustration_mode(mut self, mode: IllustrationMode) -> Self {
        self.illustration_mode = mode;
        self
    }

    pub fn with_synthesis(mut self, synthesis: &str) -> Self {
        self.synthesis = synthesis.to_string();
        self
    }

    pub fn with_chunks(mut self, chunks: &[&str]) -> Self {
        self.chunks = chunks.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Every structured request fails, which makes planning task-fatal.
    pub fn failing_structured(mut self) -> Self {
        self.fail_structured = true;
        self
    }

    /// Prompts passed to `stream`, in call order.
    pub fn stream_prompts(&self) -> Vec<String> {
        self.stream_prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok("Generated Title".to_string())
    }

    async fn generate_with_system(&self, _system: &str, _prompt: &str) -> Result<String> {
        Ok(self.synthesis.clone())
    }

    async fn generate_structured(
        &self,
        _system: &str,
        _prompt: &str,
        schema: &Value,
    ) -> Result<Value> {
        if self.fail_structured {
            return Err(AppError::LLM("Mock structured failure".to_string()));
        }

        let properties = &schema["properties"];
        if properties.get("sections").is_some() {
            return Ok(self.plan.clone());
        }
        if properties.get("is_complete").is_some() {
            return match self.gap_mode {
                GapMode::Complete => Ok(json!({"is_complete": true})),
                GapMode::Incomplete => Ok(json!({
                    "is_complete": false,
                    "missing_info": "still missing details",
                    "actions": [{"tool": "search", "target": "follow-up query"}],
                })),
                GapMode::Failing => Err(AppError::LLM("Mock gap failure".to_string())),
            };
        }
        if properties.get("needs_illustration").is_some() {
            return match self.illustration_mode {
                IllustrationMode::Decline => {
                    Ok(json!({"needs_illustration": false, "reason": "text suffices"}))
                }
                IllustrationMode::Approve => Ok(json!({
                    "needs_illustration": true,
                    "reason": "the structure is best shown as a diagram",
                })),
                IllustrationMode::Failing => {
                    Err(AppError::LLM("Mock illustration failure".to_string()))
                }
            };
        }
        if properties.get("visualization_type").is_some() {
            return Ok(json!({
                "visualization_type": "mermaid",
                "code_prompt": "Diagram the relationship between the concepts",
            }));
        }
        Err(AppError::LLM("unexpected structured request".to_string()))
    }

    async fn stream(&self, prompt: &str) -> Result<TextStream> {
        self.stream_prompts.lock().unwrap().push(prompt.to_string());

        let delay = self.chunk_delay;
        let chunks = self.chunks.clone();
        let stream = stream::iter(chunks).then(move |chunk| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(chunk)
        });
        Ok(stream.boxed())
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Model factory that hands every task the same mock client.
pub struct FixedModelFactory {
    client: Arc<MockLLMClient>,
}

impl FixedModelFactory {
    pub fn new(client: Arc<MockLLMClient>) -> Self {
        Self { client }
    }
}

impl ModelFactory for FixedModelFactory {
    fn create(&self, _config: &TaskConfig) -> Result<Arc<dyn LLMClient>> {
        Ok(self.client.clone())
    }
}

/// Mock research tools with canned results and per-query delays.
pub struct MockTools {
    results: Vec<RetrievalResult>,
    /// Queries containing the substring sleep for the given duration first.
    delays: Vec<(String, Duration)>,
    fail: bool,
}

impl MockTools {
    pub fn new() -> Self {
        Self {
            results: vec![RetrievalResult {
                title: "A relevant source".to_string(),
                url: "https://example.com/source".to_string(),
                content: "Relevant content.".to_string(),
            }],
            delays: Vec::new(),
            fail: false,
        }
    }

    /// Searches whose query contains `needle` take `delay` to return.
    pub fn with_delay(mut self, needle: &str, delay: Duration) -> Self {
        self.delays.push((needle.to_string(), delay));
        self
    }

    /// Every search and crawl fails.
    pub fn failing() -> Self {
        Self {
            results: Vec::new(),
            delays: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl ResearchTools for MockTools {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>> {
        for (needle, delay) in &self.delays {
            if query.contains(needle.as_str()) {
                tokio::time::sleep(*delay).await;
            }
        }
        if self.fail {
            return Err(AppError::Tool("Mock search failure".to_string()));
        }
        Ok(self.results.iter().take(k).cloned().collect())
    }

    async fn crawl(&self, _url: &str) -> Result<String> {
        if self.fail {
            return Err(AppError::Tool("Mock crawl failure".to_string()));
        }
        Ok("Crawled page content.".to_string())
    }
}

/// Tool factory that ignores task config and returns the fixed tools.
pub struct FixedToolFactory {
    tools: Arc<MockTools>,
}

impl FixedToolFactory {
    pub fn new(tools: Arc<MockTools>) -> Self {
        Self { tools }
    }
}

impl ToolFactory for FixedToolFactory {
    fn create(&self, _config: &TaskConfig) -> Arc<dyn ResearchTools> {
        self.tools.clone()
    }
}

/// Event sink that records everything it is given.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Events whose `data.event_type` matches.
    pub fn count_type(&self, event_type: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| e.event_type() == Some(event_type))
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| e.kind == EventKind::AgentError)
            .count()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Event sink that tracks how many pipelines run at once.
///
/// A pipeline is counted from its first Planner event until its terminal
/// `completed` or error event.
#[derive(Default)]
pub struct ConcurrencyProbeSink {
    gauge: Mutex<(usize, usize)>,
    completed: Mutex<usize>,
    errors: Mutex<usize>,
}

impl ConcurrencyProbeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest number of simultaneously active pipelines observed.
    pub fn peak(&self) -> usize {
        self.gauge.lock().unwrap().1
    }

    pub fn completed(&self) -> usize {
        *self.completed.lock().unwrap()
    }

    pub fn errors(&self) -> usize {
        *self.errors.lock().unwrap()
    }
}

#[async_trait]
impl EventSink for ConcurrencyProbeSink {
    async fn emit(&self, event: ProgressEvent) {
        if event.payload.agent.as_deref() == Some("Planner")
            && event.payload.status.as_deref() == Some("thinking")
        {
            let mut gauge = self.gauge.lock().unwrap();
            gauge.0 += 1;
            gauge.1 = gauge.1.max(gauge.0);
        } else if event.event_type() == Some("completed") {
            self.gauge.lock().unwrap().0 -= 1;
            *self.completed.lock().unwrap() += 1;
        } else if event.kind == EventKind::AgentError {
            self.gauge.lock().unwrap().0 -= 1;
            *self.errors.lock().unwrap() += 1;
        }
    }
}

/// In-memory result store.
#[derive(Default)]
pub struct MemoryStore {
    intermediate: Mutex<Vec<(String, SectionDraft)>>,
    finals: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every save fails, for exercising the log-and-continue paths.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn intermediate(&self) -> Vec<(String, SectionDraft)> {
        self.intermediate.lock().unwrap().clone()
    }

    pub fn finals(&self) -> Vec<(String, String)> {
        self.finals.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn save_intermediate(&self, request_id: &str, draft: &SectionDraft) -> Result<()> {
        if self.fail {
            return Err(AppError::Persistence("Mock store failure".to_string()));
        }
        self.intermediate
            .lock()
            .unwrap()
            .push((request_id.to_string(), draft.clone()));
        Ok(())
    }

    async fn save_final(&self, chat_id: &str, content: &str) -> Result<()> {
        if self.fail {
            return Err(AppError::Persistence("Mock store failure".to_string()));
        }
        self.finals
            .lock()
            .unwrap()
            .push((chat_id.to_string(), content.to_string()));
        Ok(())
    }
}

/// Queue backed by a fixed list of tasks; blocks forever once drained,
/// like a blocking pop against an empty Redis list.
pub struct VecQueue {
    tasks: Mutex<VecDeque<Task>>,
}

impl VecQueue {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks.into()),
        }
    }
}

#[async_trait]
impl WorkQueue for VecQueue {
    async fn pop(&self) -> Result<Option<Task>> {
        let next = self.tasks.lock().unwrap().pop_front();
        match next {
            Some(task) => Ok(Some(task)),
            None => futures::future::pending().await,
        }
    }
}

/// A minimal task with illustrations disabled and no chat.
pub fn task(request_id: &str) -> Task {
    Task {
        request_id: request_id.to_string(),
        user_id: "user-1".to_string(),
        query: "What is the meaning of life?".to_string(),
        config: TaskConfig {
            provider: None,
            model: None,
            api_key: None,
            include_illustrations: false,
            serper_api_key: None,
        },
        chat_id: None,
        history: Vec::new(),
    }
}
