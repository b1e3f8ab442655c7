use crate::types::{AppError, Result};
use std::env;

/// Worker configuration loaded from the environment.
///
/// Task-level settings (provider, model, API key) arrive with each queue
/// payload; everything here is process-wide.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub queue_name: String,
    pub updates_channel: String,
    pub api_url: String,
    pub worker_api_key: String,
    pub max_concurrent: usize,
    pub max_revisions: u32,
    /// Fallback Serper key when the task config does not carry one
    pub serper_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub xai_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| {
            let host = env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".to_string());
            let port = env::var("REDIS_PORT").unwrap_or_else(|_| "6379".to_string());
            format!("redis://{}:{}", host, port)
        });

        Ok(Config {
            redis_url,
            queue_name: env::var("RESEARCH_QUEUE").unwrap_or_else(|_| "research_tasks".to_string()),
            updates_channel: env::var("UPDATES_CHANNEL").unwrap_or_else(|_| "updates".to_string()),
            api_url: env::var("API_URL")
                .unwrap_or_else(|_| "http://localhost:3000/api/v1".to_string()),
            worker_api_key: env::var("WORKER_API_KEY")
                .unwrap_or_else(|_| "prism-worker-secret".to_string()),
            max_concurrent: parse_env("MAX_CONCURRENT", 50)?,
            max_revisions: parse_env("MAX_REVISIONS", 3)?,
            serper_api_key: env::var("SERPER_API_KEY").ok(),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok(),
            google_api_key: env::var("GOOGLE_API_KEY").ok(),
            xai_api_key: env::var("XAI_API_KEY").ok(),
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::Configuration(format!("invalid value for {}: {}", key, raw))),
        Err(_) => Ok(default),
    }
}
