//! Storage layer for the lecture notes pipeline
//!
//! This module provides interfaces and implementations for the two stores the
//! pipeline writes to:
//! - **Object Storage (S3/MinIO)**: staged videos, extracted audio tracks,
//!   transcripts, and rendered PDF notes
//! - **Task Database (`PostgreSQL`)**: one row per lecture processing task,
//!   tracking its status from intake to completion
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use lecture_notes_storage::object_store::{DEFAULT_MULTIPART_THRESHOLD, DEFAULT_PART_SIZE};
//! use lecture_notes_storage::{ArtifactKind, ObjectStore, S3Config, S3ObjectStore, StorageResult};
//!
//! #[tokio::main]
//! async fn main() -> StorageResult<()> {
//!     let config = S3Config {
//!         bucket: "lecture-notes".to_string(),
//!         region: "us-east-1".to_string(),
//!         endpoint: Some("http://localhost:9000".to_string()),
//!         access_key_id: "minioadmin".to_string(),
//!         secret_access_key: "minioadmin".to_string(),
//!         public_base_url: "http://localhost:9000/lecture-notes".to_string(),
//!         multipart_threshold: DEFAULT_MULTIPART_THRESHOLD,
//!         part_size: DEFAULT_PART_SIZE,
//!     };
//!     let store = S3ObjectStore::new(config).await?;
//!
//!     // Store a transcript and hand out a time-limited link to it
//!     let url = store
//!         .put(ArtifactKind::Transcript, "task-1", b"transcript text".to_vec())
//!         .await?;
//!     let link = store.presign_get(&url, Duration::from_secs(3600)).await?;
//!     println!("{link}");
//!
//!     Ok(())
//! }
//! ```

use thiserror::Error;

pub mod object_store;
pub mod task_store;

pub use object_store::{
    ArtifactKind, MemoryObjectStore, ObjectStore, S3Config, S3ObjectStore,
    DEFAULT_MULTIPART_THRESHOLD, DEFAULT_PART_SIZE,
};
pub use task_store::{MemoryTaskStore, PostgresConfig, PostgresTaskStore, TaskStore};

/// Storage layer errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("S3 error: {0}")]
    S3Error(String),

    #[error("PostgreSQL error: {0}")]
    PostgresError(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid task record: {0}")]
    InvalidRecord(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
