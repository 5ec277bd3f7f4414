//! API Server Binary Entry Point

use std::sync::Arc;

use lecture_notes_api_server::{start_server, ApiConfig, ApiState, SourceClient};
use lecture_notes_queue::SqsQueue;
use lecture_notes_storage::{PostgresTaskStore, S3ObjectStore, TaskStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lecture_notes_api_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ApiConfig::from_env()?;

    let objects = Arc::new(S3ObjectStore::new(config.s3.clone()).await?);
    let tasks = Arc::new(PostgresTaskStore::new(config.postgres.clone()).await?);
    tasks.init_schema().await?;
    let queue = Arc::new(SqsQueue::new(config.sqs.clone()).await?);
    let source = Arc::new(SourceClient::new(
        config.source_api_url.clone(),
        max_file_bytes(config.max_video_bytes),
    )?);

    let state = ApiState::new(tasks, objects, queue, source, config.presign_expiry);

    // Start server
    tracing::info!("Starting lecture notes API server");
    start_server(&config.bind_addr, state).await?;

    Ok(())
}

/// The source metadata API reports sizes as signed integers.
fn max_file_bytes(limit: u64) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
