//! Progress event publication.
//!
//! Events are best-effort: a publish failure is logged and swallowed, never
//! propagated into pipeline control flow. Every emit is awaited in-line on
//! the pipeline's own task, so by the time the terminal event goes out all
//! earlier events have been sent or explicitly dropped-and-logged.

use crate::types::Result;
use async_trait::async_trait;
use redis::AsyncCommands;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// A structured progress payload delivered to the broadcast channel.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub target_user_id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub timestamp: String,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    AgentUpdate,
    AgentError,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ProgressEvent {
    pub fn update(
        user_id: &str,
        agent: &str,
        status: &str,
        message: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            target_user_id: user_id.to_string(),
            kind: EventKind::AgentUpdate,
            timestamp: chrono::Utc::now().to_rfc3339(),
            payload: EventPayload {
                agent: Some(agent.to_string()),
                status: Some(status.to_string()),
                message: message.into(),
                data,
                request_id: None,
            },
        }
    }

    pub fn error(user_id: &str, message: impl Into<String>, request_id: &str) -> Self {
        Self {
            target_user_id: user_id.to_string(),
            kind: EventKind::AgentError,
            timestamp: chrono::Utc::now().to_rfc3339(),
            payload: EventPayload {
                agent: None,
                status: None,
                message: message.into(),
                data: Value::Null,
                request_id: Some(request_id.to_string()),
            },
        }
    }

    /// The `event_type` tag inside `data`, when present.
    pub fn event_type(&self) -> Option<&str> {
        self.payload.data.get("event_type").and_then(Value::as_str)
    }
}

/// Delivery target for progress events, shared by all concurrent pipelines.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver one event. Must swallow (and log) its own failures.
    async fn emit(&self, event: ProgressEvent);
}

/// Publishes events as JSON on a Redis pub/sub channel.
pub struct RedisPublisher {
    conn: redis::aio::MultiplexedConnection,
    channel: String,
}

impl RedisPublisher {
    pub async fn connect(url: &str, channel: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| crate::types::AppError::Queue(format!("invalid redis url: {}", e)))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| crate::types::AppError::Queue(format!("redis connect failed: {}", e)))?;
        Ok(Self {
            conn,
            channel: channel.to_string(),
        })
    }
}

#[async_trait]
impl EventSink for RedisPublisher {
    async fn emit(&self, event: ProgressEvent) {
        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize progress event, dropping it");
                return;
            }
        };

        let mut conn = self.conn.clone();
        let published: redis::RedisResult<()> = conn.publish(&self.channel, payload).await;
        match published {
            Ok(()) => tracing::debug!(channel = %self.channel, kind = ?event.kind, "published update"),
            Err(e) => {
                tracing::warn!(error = %e, channel = %self.channel, "failed to publish update, dropping it")
            }
        }
    }
}

/// An event sink bound to one section of one task.
///
/// Each refinement engine gets its own, with the section index and topic
/// tagged into every event it emits, so interleaved events from concurrent
/// sections stay attributable.
#[derive(Clone)]
pub struct SectionSink {
    inner: Arc<dyn EventSink>,
    user_id: String,
    request_id: String,
    section_index: usize,
    topic: String,
}

impl SectionSink {
    pub fn new(
        inner: Arc<dyn EventSink>,
        user_id: &str,
        request_id: &str,
        section_index: usize,
        topic: &str,
    ) -> Self {
        Self {
            inner,
            user_id: user_id.to_string(),
            request_id: request_id.to_string(),
            section_index,
            topic: topic.to_string(),
        }
    }

    pub async fn emit(&self, event_type: &str, data: Value) {
        let mut merged = json!({
            "requestId": self.request_id,
            "event_type": event_type,
            "section_index": self.section_index,
            "topic": self.topic,
        });
        if let (Some(target), Some(extra)) = (merged.as_object_mut(), data.as_object()) {
            for (key, value) in extra {
                target.insert(key.clone(), value.clone());
            }
        }

        self.inner
            .emit(ProgressEvent::update(
                &self.user_id,
                "Researcher",
                "action",
                format!("Researching: {}", self.topic),
                merged,
            ))
            .await;
    }
}
