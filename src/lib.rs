//! # Prism Research Worker
//!
//! A queue-driven deep-research worker: it pulls research tasks from Redis,
//! plans a report, researches every section in parallel with an iterative
//! gap-check/search/synthesize loop, streams the final report, and publishes
//! progress events over pub/sub the whole way through.
//!
//! ## Overview
//!
//! Prism can be used in two ways:
//!
//! 1. **As a standalone worker** - Run the `prism-worker` binary against a
//!    Redis queue and a results API
//! 2. **As a library** - Drive the pipeline directly with your own queue,
//!    event sink, and storage implementations
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use prism::llm::Provider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = Provider::OpenAI {
//!         api_key: "sk-...".to_string(),
//!         model: "gpt-4-turbo".to_string(),
//!     };
//!
//!     let client = provider.create_client()?;
//!     let response = client.generate("Summarize Rust's ownership model").await?;
//!     println!("{}", response);
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Running a pipeline with custom backends
//!
//! Every external dependency of the pipeline sits behind a trait, so the
//! whole flow can be driven without Redis or HTTP:
//!
//! ```rust,ignore
//! use prism::worker::{Pipeline, Worker};
//! use std::sync::Arc;
//!
//! let pipeline = Arc::new(Pipeline::new(models, tools, store, sink, 3));
//! let worker = Worker::new(queue, pipeline, 50);
//! worker.run().await;
//! ```
//!
//! ## Architecture
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`worker`] | Queue consumer and per-task pipeline orchestration |
//! | [`agents`] | Planning, per-section refinement, report conclusion |
//! | [`llm`] | Provider-agnostic LLM clients and structured output |
//! | [`tools`] | Web search, crawling, and illustration generation |
//! | [`memory`] | Conversation history compaction |
//! | [`events`] | Progress event shapes and Redis publishing |
//! | [`queue`] | Blocking task queue consumption |
//! | [`persistence`] | Intermediate and final result storage over HTTP |

pub mod agents;
pub mod config;
pub mod events;
pub mod llm;
pub mod memory;
pub mod persistence;
pub mod queue;
pub mod tools;
pub mod types;
pub mod worker;

// Re-export the most commonly used items at the crate root
pub use config::Config;
pub use events::{EventSink, ProgressEvent, RedisPublisher};
pub use llm::{DefaultModelFactory, LLMClient, ModelFactory, Provider};
pub use persistence::{HttpResultStore, ResultStore};
pub use queue::{RedisWorkQueue, WorkQueue};
pub use tools::{ResearchTools, ToolFactory, WebToolFactory};
pub use types::{AppError, Result, Task};
pub use worker::{Pipeline, Worker};
