use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============= Task Types =============

/// A research request pulled off the work queue.
///
/// Produced by the API layer, consumed exactly once by one pipeline run.
/// Field names match the queue wire format (camelCase JSON).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default = "default_request_id")]
    pub request_id: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    pub query: String,
    #[serde(default)]
    pub config: TaskConfig,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

fn default_user_id() -> String {
    "unknown".to_string()
}

// A payload without a request id still gets processed and stays traceable
fn default_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Per-task model and tool configuration carried in the queue payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskConfig {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_true")]
    pub include_illustrations: bool,
    #[serde(default)]
    pub serper_api_key: Option<String>,
}

fn default_true() -> bool {
    true
}

// Keep `Default` consistent with the serde field defaults above: an absent
// `config` object and a present-but-empty one must produce the same values.
impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            api_key: None,
            include_illustrations: true,
            serper_api_key: None,
        }
    }
}

/// One turn of prior conversation attached to a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

// ============= Plan Types =============

/// Ordered table of contents for the report. Plan order is presentation order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResearchPlan {
    /// List of sections for the research report, in presentation order
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    /// The title of the section
    pub title: String,
    /// A brief description of what this section should cover
    pub description: String,
}

// ============= Refinement Types =============

/// Structured verdict from the gap-analysis step of the refinement loop.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GapAnalysis {
    /// Whether the section draft completely covers the topic and description
    pub is_complete: bool,
    /// What specific information is missing, if any
    #[serde(default)]
    pub missing_info: String,
    /// Actions (search or crawl) to find the missing information
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// A single retrieval step requested by the gap analyzer.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Action {
    /// The tool to use: 'search' for a web search, 'crawl' to visit a specific URL
    pub tool: ActionTool,
    /// The search query or the URL to crawl
    pub target: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionTool {
    Search,
    Crawl,
}

/// A retrieved source: one search hit or one crawled page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    pub title: String,
    pub url: String,
    pub content: String,
}

/// Completed output of one section's refinement run.
#[derive(Debug, Clone, Serialize)]
pub struct SectionResult {
    pub title: String,
    pub content: String,
    pub sources: Vec<RetrievalResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub illustration: Option<Illustration>,
}

// ============= Illustration Types =============

/// A generated visual aid for one section. Immutable once produced.
#[derive(Debug, Clone, Serialize)]
pub struct Illustration {
    #[serde(rename = "type")]
    pub kind: IllustrationKind,
    pub visualization_type: VisualizationType,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IllustrationKind {
    Code,
}

/// The closed set of visualization libraries the illustration stage may pick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationType {
    D3,
    P5,
    Three,
    Html,
    Mermaid,
}

impl VisualizationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisualizationType::D3 => "d3",
            VisualizationType::P5 => "p5",
            VisualizationType::Three => "three",
            VisualizationType::Html => "html",
            VisualizationType::Mermaid => "mermaid",
        }
    }
}

/// Verdict on whether a section warrants a visual aid at all.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct IllustrationNeed {
    /// Whether a visualization would materially improve understanding of the section
    pub needs_illustration: bool,
    /// Concrete justification tied to the section content
    #[serde(default)]
    pub reason: String,
}

/// Library choice plus the generation prompt for the visual aid.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct IllustrationDecision {
    /// The library to use for the visualization
    pub visualization_type: VisualizationType,
    /// The specific prompt for code generation
    pub code_prompt: String,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
