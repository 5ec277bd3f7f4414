//! Integration tests for storage backends
//!
//! These tests require live instances of `MinIO` (with a `lecture-notes`
//! bucket) and `PostgreSQL`. Start services with: `docker-compose up -d`
//!
//! Run tests with: `cargo test --package lecture-notes-storage --test storage_integration_test -- --ignored --nocapture`
//!
//! All tests are marked with #[ignore] to prevent running in CI without live services.

use std::time::Duration;

use lecture_notes_common::{TaskRecord, TaskStatus};
use lecture_notes_storage::object_store::{DEFAULT_MULTIPART_THRESHOLD, DEFAULT_PART_SIZE};
use lecture_notes_storage::{
    ArtifactKind, ObjectStore, PostgresConfig, PostgresTaskStore, S3Config, S3ObjectStore,
    TaskStore,
};

/// Check if `MinIO` is available
async fn is_minio_available() -> bool {
    tokio::net::TcpStream::connect("127.0.0.1:9000")
        .await
        .is_ok()
}

/// Check if `PostgreSQL` is available
async fn is_postgres_available() -> bool {
    tokio::net::TcpStream::connect("127.0.0.1:5432")
        .await
        .is_ok()
}

fn minio_config() -> S3Config {
    S3Config {
        bucket: "lecture-notes".to_string(),
        region: "us-east-1".to_string(),
        endpoint: Some("http://localhost:9000".to_string()),
        access_key_id: "minioadmin".to_string(),
        secret_access_key: "minioadmin".to_string(),
        public_base_url: "http://localhost:9000/lecture-notes".to_string(),
        multipart_threshold: DEFAULT_MULTIPART_THRESHOLD,
        part_size: DEFAULT_PART_SIZE,
    }
}

fn postgres_config() -> PostgresConfig {
    PostgresConfig {
        host: "localhost".to_string(),
        port: 5432,
        database: "lecture_notes".to_string(),
        user: "postgres".to_string(),
        password: "postgres".to_string(),
    }
}

// ============================================================================
// MinIO Object Storage Integration Tests
// ============================================================================

#[tokio::test]
#[ignore] // Requires MinIO running on localhost:9000
async fn test_minio_artifact_round_trip() {
    if !is_minio_available().await {
        eprintln!("MinIO not available on 127.0.0.1:9000");
        eprintln!("Start with: docker-compose up -d minio");
        eprintln!("Skipping test_minio_artifact_round_trip");
        return;
    }

    let store = S3ObjectStore::new(minio_config())
        .await
        .expect("Failed to create S3 store client");

    let task_id = uuid::Uuid::new_v4().to_string();
    let transcript = b"Today we cover eigenvalues and eigenvectors.".to_vec();

    // Store a transcript
    let url = store
        .put(ArtifactKind::Transcript, &task_id, transcript.clone())
        .await
        .expect("Failed to store transcript");
    assert_eq!(
        url,
        format!("http://localhost:9000/lecture-notes/transcripts/{task_id}.txt")
    );

    // Retrieve it back through its storage URL
    let retrieved = store.get(&url).await.expect("Failed to retrieve transcript");
    assert_eq!(retrieved, transcript);

    // Presigned link points at the same object
    let link = store
        .presign_get(&url, Duration::from_secs(3600))
        .await
        .expect("Failed to presign");
    assert!(link.contains(&format!("transcripts/{task_id}.txt")));

    println!("✅ MinIO integration test passed: put, get, presign");
}

#[tokio::test]
#[ignore] // Requires MinIO running on localhost:9000
async fn test_minio_put_from_path() {
    if !is_minio_available().await {
        eprintln!("MinIO not available on 127.0.0.1:9000");
        eprintln!("Skipping test_minio_put_from_path");
        return;
    }

    let store = S3ObjectStore::new(minio_config())
        .await
        .expect("Failed to create S3 store client");

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let audio_path = temp_dir.path().join("audio.mp3");
    let audio_data = vec![0x49u8, 0x44, 0x33, 0x04, 0x00];
    std::fs::write(&audio_path, &audio_data).expect("Failed to write temp file");

    let task_id = uuid::Uuid::new_v4().to_string();
    let url = store
        .put_file(ArtifactKind::Audio, &task_id, &audio_path)
        .await
        .expect("Failed to store audio from path");

    let retrieved = store.get(&url).await.expect("Failed to retrieve audio");
    assert_eq!(retrieved, audio_data);

    println!("✅ MinIO integration test passed: put_file");
}

// ============================================================================
// PostgreSQL Task Store Integration Tests
// ============================================================================

#[tokio::test]
#[ignore] // Requires PostgreSQL running on localhost:5432
async fn test_postgres_schema_init() {
    if !is_postgres_available().await {
        eprintln!("PostgreSQL not available on 127.0.0.1:5432");
        eprintln!("Start with: docker-compose up -d postgres");
        eprintln!("Skipping test_postgres_schema_init");
        return;
    }

    let store = PostgresTaskStore::new(postgres_config())
        .await
        .expect("Failed to connect to PostgreSQL");

    store
        .init_schema()
        .await
        .expect("Failed to initialize schema");

    // Re-initialize should be idempotent (no error)
    store
        .init_schema()
        .await
        .expect("Schema initialization should be idempotent");

    println!("✅ PostgreSQL integration test passed: schema initialization");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL running on localhost:5432
async fn test_postgres_task_lifecycle() {
    if !is_postgres_available().await {
        eprintln!("PostgreSQL not available on 127.0.0.1:5432");
        eprintln!("Skipping test_postgres_task_lifecycle");
        return;
    }

    let store = PostgresTaskStore::new(postgres_config())
        .await
        .expect("Failed to connect to PostgreSQL");

    store
        .init_schema()
        .await
        .expect("Failed to initialize schema");

    let task_id = uuid::Uuid::new_v4().to_string();
    let task = TaskRecord::queued(
        task_id.clone(),
        "Databases, Lecture 7".to_string(),
        "https://share.example.com/d/xyz".to_string(),
        "https://downloader.example.com/xyz".to_string(),
    );

    store.insert(&task).await.expect("Failed to insert task");

    let loaded = store.get(&task_id).await.expect("Failed to load task");
    assert_eq!(loaded.status, TaskStatus::Queued);
    assert_eq!(loaded.lecture_title, "Databases, Lecture 7");

    store
        .mark_in_progress(&task_id)
        .await
        .expect("Failed to mark in progress");
    store
        .mark_completed(&task_id, "http://localhost:9000/lecture-notes/notes/x.pdf")
        .await
        .expect("Failed to mark completed");

    // A late failure report must not overwrite the completed state
    store
        .mark_error(&task_id, "late redelivery")
        .await
        .expect("mark_error should be a guarded no-op");

    let finished = store.get(&task_id).await.expect("Failed to reload task");
    assert_eq!(finished.status, TaskStatus::Completed);
    assert_eq!(
        finished.pdf_url.as_deref(),
        Some("http://localhost:9000/lecture-notes/notes/x.pdf")
    );
    assert_eq!(finished.error_message, None);

    let all = store.list().await.expect("Failed to list tasks");
    assert!(all.iter().any(|t| t.task_id == task_id));

    println!("✅ PostgreSQL integration test passed: task lifecycle with terminal guard");
}
