//! Web search via the Serper.dev Google Search API.

use crate::types::{AppError, Result, RetrievalResult};
use serde_json::{json, Value};

const SERPER_URL: &str = "https://google.serper.dev/search";

pub struct SerperClient {
    client: reqwest::Client,
    api_key: Option<String>,
    url: String,
}

impl SerperClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_url(SERPER_URL, api_key)
    }

    pub fn with_url(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            url: url.into(),
        }
    }

    /// Execute a Google search, returning up to `k` results.
    ///
    /// Maps `organic` hits to title/url/snippet; when there are none but an
    /// answer box is present, that becomes the single result.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Tool("SERPER_API_KEY is not set".to_string()))?;

        let response = self
            .client
            .post(&self.url)
            .header("X-API-KEY", api_key)
            .json(&json!({"q": query, "num": k}))
            .send()
            .await
            .map_err(|e| AppError::Tool(format!("serper request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Tool(format!("serper returned {}", status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Tool(format!("malformed serper response: {}", e)))?;

        let mut results = Vec::new();
        if let Some(organic) = body.get("organic").and_then(Value::as_array) {
            for hit in organic.iter().take(k) {
                results.push(RetrievalResult {
                    title: str_field(hit, "title"),
                    url: str_field(hit, "link"),
                    content: str_field(hit, "snippet"),
                });
            }
        }

        if results.is_empty() {
            if let Some(answer_box) = body.get("answerBox") {
                let content = match str_field(answer_box, "snippet") {
                    snippet if !snippet.is_empty() => snippet,
                    _ => str_field(answer_box, "answer"),
                };
                results.push(RetrievalResult {
                    title: answer_box
                        .get("title")
                        .and_then(Value::as_str)
                        .unwrap_or("Answer")
                        .to_string(),
                    url: String::new(),
                    content,
                });
            }
        }

        Ok(results)
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
