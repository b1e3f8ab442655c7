//! Retrieval tools: web search, page crawling, and illustration generation.

pub mod crawler;
pub mod illustration;
pub mod serper;

pub use crawler::Crawler;
pub use illustration::IllustrationTool;
pub use serper::SerperClient;

use crate::types::{Result, RetrievalResult, TaskConfig};
use async_trait::async_trait;
use std::sync::Arc;

/// The retrieval capabilities the refinement engine acts with.
///
/// Implementations may fail; the engine treats any failure as "nothing found"
/// and never lets it abort a section.
#[async_trait]
pub trait ResearchTools: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>>;
    async fn crawl(&self, url: &str) -> Result<String>;
}

/// Builds a toolset per task, honoring per-task API keys.
pub trait ToolFactory: Send + Sync {
    fn create(&self, config: &TaskConfig) -> Arc<dyn ResearchTools>;
}

/// Production toolset: Serper search plus a page crawler.
pub struct WebTools {
    serper: SerperClient,
    crawler: Crawler,
}

impl WebTools {
    pub fn new(serper_api_key: Option<String>) -> Self {
        Self {
            serper: SerperClient::new(serper_api_key),
            crawler: Crawler::new(),
        }
    }
}

#[async_trait]
impl ResearchTools for WebTools {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>> {
        self.serper.search(query, k).await
    }

    async fn crawl(&self, url: &str) -> Result<String> {
        self.crawler.crawl(url).await
    }
}

/// Default factory: the task's Serper key wins, the worker-level key is the
/// fallback.
pub struct WebToolFactory {
    fallback_serper_key: Option<String>,
}

impl WebToolFactory {
    pub fn new(fallback_serper_key: Option<String>) -> Self {
        Self { fallback_serper_key }
    }
}

impl ToolFactory for WebToolFactory {
    fn create(&self, config: &TaskConfig) -> Arc<dyn ResearchTools> {
        let key = config
            .serper_api_key
            .clone()
            .or_else(|| self.fallback_serper_key.clone());
        Arc::new(WebTools::new(key))
    }
}
