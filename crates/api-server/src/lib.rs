//! REST API front door for the lecture notes pipeline
//!
//! Two endpoints drive the system: `POST /tasks` accepts a lecture video
//! share link and seeds the processing queue, `GET /tasks` lists every
//! task with a presigned link to its finished note.

mod handlers;
mod types;

pub mod config;
pub mod source;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use lecture_notes_queue::TaskQueue;
use lecture_notes_storage::{ObjectStore, TaskStore};

use crate::source::SourceProbe;

pub use config::ApiConfig;
pub use handlers::*;
pub use source::{ProbedFile, SourceClient, SourceError};
pub use types::*;

/// API server state shared across handlers
#[derive(Clone)]
pub struct ApiState {
    /// Task records
    pub tasks: Arc<dyn TaskStore>,
    /// Artifact storage, used to presign note links
    pub objects: Arc<dyn ObjectStore>,
    /// Pipeline queue fed by intake
    pub queue: Arc<dyn TaskQueue>,
    /// Share-link metadata probe
    pub source: Arc<dyn SourceProbe>,
    /// Lifetime of presigned note links
    pub presign_expiry: Duration,
}

impl ApiState {
    /// Create new API state
    #[must_use]
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        objects: Arc<dyn ObjectStore>,
        queue: Arc<dyn TaskQueue>,
        source: Arc<dyn SourceProbe>,
        presign_expiry: Duration,
    ) -> Self {
        Self {
            tasks,
            objects,
            queue,
            source,
            presign_expiry,
        }
    }
}

/// Build the API router with all endpoints
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Task intake and listing
        .route("/tasks", post(create_task).get(list_tasks))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server
pub async fn start_server(addr: &str, state: ApiState) -> Result<(), std::io::Error> {
    tracing::info!("Starting API server on {}", addr);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await
}
