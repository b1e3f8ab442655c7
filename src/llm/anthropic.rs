//! Anthropic Messages API client.

use crate::llm::client::{LLMClient, TextStream};
use crate::llm::extract_json;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};

const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 8192;

pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Deserialize)]
struct StreamDelta {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url("https://api.anthropic.com", api_key, model)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model,
        }
    }

    fn request_body(&self, system: Option<&str>, prompt: &str, stream: bool) -> Value {
        let mut body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [{"role": "user", "content": prompt}],
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        if stream {
            body["stream"] = json!(true);
        }
        body
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::LLM(format!("messages request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::LLM(format!(
                "messages request returned {}: {}",
                status, detail
            )));
        }
        Ok(response)
    }

    async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String> {
        let response = self.send(&self.request_body(system, prompt, false)).await?;
        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLM(format!("malformed messages response: {}", e)))?;

        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| AppError::LLM("no text content in messages response".to_string()))
    }
}

#[async_trait]
impl LLMClient for AnthropicClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.complete(None, prompt).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.complete(Some(system), prompt).await
    }

    async fn generate_structured(
        &self,
        system: &str,
        prompt: &str,
        schema: &Value,
    ) -> Result<Value> {
        let system = format!(
            "{}\n\nRespond with a single JSON object conforming to this JSON schema, \
             with no other text:\n{}",
            system, schema
        );
        let content = self.complete(Some(&system), prompt).await?;
        extract_json(&content)
    }

    async fn stream(&self, prompt: &str) -> Result<TextStream> {
        let response = self.send(&self.request_body(None, prompt, true)).await?;

        let stream = async_stream::try_stream! {
            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();
            while let Some(chunk) = bytes.next().await {
                let chunk =
                    chunk.map_err(|e| AppError::LLM(format!("stream read failed: {}", e)))?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer.drain(..=line_end);

                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let Ok(event) = serde_json::from_str::<StreamEvent>(data.trim()) else {
                        continue;
                    };
                    if event.kind != "content_block_delta" {
                        continue;
                    }
                    if let Some(text) = event.delta.and_then(|delta| delta.text) {
                        if !text.is_empty() {
                            yield text;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
