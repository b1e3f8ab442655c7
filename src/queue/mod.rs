//! Work queue consumption.
//!
//! The transport is a blocking-pop list; consumption is at-most-once. A
//! successfully popped task is gone from the queue whether or not its
//! pipeline finishes.

use crate::types::{AppError, Result, Task};
use async_trait::async_trait;
use redis::AsyncCommands;

/// Source of research tasks for the worker.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Wait for and return the next task.
    ///
    /// `Ok(None)` means "nothing this round, retry"; transport failures come
    /// back as `Err` so the consumer can back off.
    async fn pop(&self) -> Result<Option<Task>>;
}

/// Redis-backed queue: `BLPOP` on a named list.
pub struct RedisWorkQueue {
    conn: redis::aio::MultiplexedConnection,
    queue: String,
}

impl RedisWorkQueue {
    /// Connect and verify the server is reachable.
    pub async fn connect(url: &str, queue: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| AppError::Queue(format!("invalid redis url: {}", e)))?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Queue(format!("redis connect failed: {}", e)))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Queue(format!("redis ping failed: {}", e)))?;

        Ok(Self {
            conn,
            queue: queue.to_string(),
        })
    }
}

#[async_trait]
impl WorkQueue for RedisWorkQueue {
    async fn pop(&self) -> Result<Option<Task>> {
        // Dedicated connection: BLPOP with no timeout parks it until a task
        // arrives, which must not stall the publisher's connection.
        let mut conn = self.conn.clone();
        let popped: Option<(String, String)> = conn
            .blpop(&self.queue, 0.0)
            .await
            .map_err(|e| AppError::Queue(format!("blpop failed: {}", e)))?;

        let Some((_queue, raw)) = popped else {
            return Ok(None);
        };

        match serde_json::from_str::<Task>(&raw) {
            Ok(task) => Ok(Some(task)),
            Err(e) => {
                // At-most-once: a malformed payload is dropped, not retried
                tracing::error!(error = %e, "discarding malformed task payload");
                Ok(None)
            }
        }
    }
}
