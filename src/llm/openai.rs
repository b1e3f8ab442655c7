//! OpenAI-compatible chat completions client.
//!
//! Serves OpenAI itself plus the Google and xAI compatibility endpoints, so
//! one implementation covers three providers.

use crate::llm::client::{LLMClient, TextStream};
use crate::llm::extract_json;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};

pub struct OpenAICompatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAICompatClient {
    pub fn new(base_url: impl Into<String>, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model,
        }
    }

    fn request_body(&self, messages: Vec<Value>, json_mode: bool, stream: bool) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }
        if stream {
            body["stream"] = json!(true);
        }
        body
    }

    async fn chat(&self, body: Value) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLM(format!("chat request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::LLM(format!(
                "chat request returned {}: {}",
                status, detail
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLM(format!("malformed chat response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::LLM("no content in chat response".to_string()))
    }
}

#[async_trait]
impl LLMClient for OpenAICompatClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let messages = vec![json!({"role": "user", "content": prompt})];
        self.chat(self.request_body(messages, false, false)).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        let messages = vec![
            json!({"role": "system", "content": system}),
            json!({"role": "user", "content": prompt}),
        ];
        self.chat(self.request_body(messages, false, false)).await
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
        let messages = vec![
            json!({"role": "system", "content": system}),
            json!({"role": "user", "content": prompt}),
        ];
        let content = self.chat(self.request_body(messages, true, false)).await?;
        extract_json(&content)
    }

    async fn stream(&self, prompt: &str) -> Result<TextStream> {
        let messages = vec![json!({"role": "user", "content": prompt})];
        let body = self.request_body(messages, false, true);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLM(format!("stream request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::LLM(format!(
                "stream request returned {}: {}",
                status, detail
            )));
        }

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
                    let data = data.trim();
                    if data.is_empty() || data == "[DONE]" {
                        continue;
                    }

                    // Skip undecodable keep-alive frames rather than failing the report
                    let Ok(parsed) = serde_json::from_str::<StreamChunk>(data) else {
                        continue;
                    };
                    if let Some(text) = parsed
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|choice| choice.delta.content)
                    {
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
