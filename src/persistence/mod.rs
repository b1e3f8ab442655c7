//! Persistence client for the Prism API.
//!
//! The worker issues exactly two kinds of writes: intermediate section
//! drafts, and the final report message. Both are authenticated with the
//! shared worker secret.

use crate::types::{AppError, Illustration, Result, RetrievalResult};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

/// An intermediate section draft as the API stores it.
#[derive(Debug, Clone, Serialize)]
pub struct SectionDraft {
    pub title: String,
    pub content: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<RetrievalResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub illustration: Option<Illustration>,
}

impl SectionDraft {
    pub fn draft(
        title: impl Into<String>,
        content: impl Into<String>,
        sources: Vec<RetrievalResult>,
        illustration: Option<Illustration>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            status: "draft",
            sources,
            illustration,
        }
    }
}

/// Where pipeline results go.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Store one section's draft as soon as it completes.
    async fn save_intermediate(&self, request_id: &str, draft: &SectionDraft) -> Result<()>;

    /// Store the final aggregated report as a chat message.
    async fn save_final(&self, chat_id: &str, content: &str) -> Result<()>;
}

/// HTTP client for the Prism API's worker endpoints.
pub struct HttpResultStore {
    client: reqwest::Client,
    base_url: String,
    worker_secret: String,
}

impl HttpResultStore {
    pub fn new(base_url: impl Into<String>, worker_secret: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            worker_secret: worker_secret.into(),
        }
    }

    async fn post(&self, url: String, body: serde_json::Value) -> Result<()> {
        let response = self
            .client
            .post(&url)
            .header("x-worker-secret", &self.worker_secret)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Persistence(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Persistence(format!(
                "{} returned {}",
                url, status
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ResultStore for HttpResultStore {
    async fn save_intermediate(&self, request_id: &str, draft: &SectionDraft) -> Result<()> {
        let url = format!("{}/research/worker/result/{}", self.base_url, request_id);
        self.post(url, json!({"content": draft})).await
    }

    async fn save_final(&self, chat_id: &str, content: &str) -> Result<()> {
        let url = format!("{}/chats/{}/messages/worker", self.base_url, chat_id);
        self.post(url, json!({"content": content, "role": "assistant"}))
            .await
    }
}
