//! The standalone Prism worker binary.
//!
//! Connects to Redis (fatal on failure), then consumes research tasks until
//! killed. All per-task failures are reported over pub/sub and logged; only
//! startup errors exit the process.

use clap::Parser;
use prism::events::RedisPublisher;
use prism::llm::DefaultModelFactory;
use prism::persistence::HttpResultStore;
use prism::queue::RedisWorkQueue;
use prism::tools::WebToolFactory;
use prism::worker::{Pipeline, Worker};
use prism::Config;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "prism-worker", version, about = "Queue-driven deep-research worker")]
struct Args {
    /// Redis connection URL (overrides REDIS_URL)
    #[arg(long)]
    redis_url: Option<String>,

    /// Maximum number of tasks processed concurrently
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Emit logs as JSON instead of human-readable lines
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real deployments set the environment directly
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(args.log_json);

    let mut config = Config::from_env()?;
    if let Some(url) = args.redis_url {
        config.redis_url = url;
    }
    if let Some(n) = args.max_concurrent {
        config.max_concurrent = n;
    }

    tracing::info!(
        redis_url = %config.redis_url,
        queue = %config.queue_name,
        channel = %config.updates_channel,
        max_concurrent = config.max_concurrent,
        "starting prism worker"
    );

    // Redis is the one hard dependency: fail fast if it is unreachable
    let queue = Arc::new(RedisWorkQueue::connect(&config.redis_url, &config.queue_name).await?);
    let sink = Arc::new(RedisPublisher::connect(&config.redis_url, &config.updates_channel).await?);

    let models = Arc::new(DefaultModelFactory::new(&config));
    let tools = Arc::new(WebToolFactory::new(config.serper_api_key.clone()));
    let store = Arc::new(HttpResultStore::new(
        config.api_url.clone(),
        config.worker_api_key.clone(),
    ));

    let pipeline = Arc::new(Pipeline::new(
        models,
        tools,
        store,
        sink,
        config.max_revisions,
    ));
    let worker = Worker::new(queue, pipeline, config.max_concurrent);

    tracing::info!("worker ready, waiting for tasks");
    worker.run().await;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
