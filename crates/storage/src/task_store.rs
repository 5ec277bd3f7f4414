//! Task state tracking backed by `PostgreSQL`
//!
//! One row per lecture processing task. Every status update carries a guard
//! against terminal rows, so a redelivered message cannot move a task out of
//! `Error` or `Completed`.

use crate::{StorageError, StorageResult};
use lecture_notes_common::{TaskRecord, TaskStatus};
use std::collections::HashMap;
use tokio_postgres::{Client, NoTls, Row};
use tracing::debug;

/// `PostgreSQL` configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database host
    pub host: String,

    /// Database port
    pub port: u16,

    /// Database name
    pub database: String,

    /// Database user
    pub user: String,

    /// Database password
    pub password: String,
}

impl PostgresConfig {
    /// Build connection string
    #[must_use]
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={}",
            self.host, self.port, self.database, self.user, self.password
        )
    }
}

/// Task store trait
#[async_trait::async_trait]
pub trait TaskStore: Send + Sync {
    /// Initialize database schema (create tables if not exist)
    async fn init_schema(&self) -> StorageResult<()>;

    /// Insert a freshly accepted task
    async fn insert(&self, task: &TaskRecord) -> StorageResult<()>;

    /// Retrieve a task by id
    async fn get(&self, task_id: &str) -> StorageResult<TaskRecord>;

    /// Retrieve all tasks, newest first
    async fn list(&self) -> StorageResult<Vec<TaskRecord>>;

    /// Move a task to `InProgress` unless it is already terminal
    async fn mark_in_progress(&self, task_id: &str) -> StorageResult<()>;

    /// Move a task to `Error` with a reason, unless it is already terminal
    async fn mark_error(&self, task_id: &str, message: &str) -> StorageResult<()>;

    /// Move a task to `Completed` and record its note URL, unless it is
    /// already terminal
    async fn mark_completed(&self, task_id: &str, pdf_url: &str) -> StorageResult<()>;

    /// Lecture title of a task
    async fn lecture_title(&self, task_id: &str) -> StorageResult<String>;
}

/// `PostgreSQL` task store implementation
pub struct PostgresTaskStore {
    client: Client,
}

impl PostgresTaskStore {
    /// Create a new `PostgreSQL` task store client
    pub async fn new(config: PostgresConfig) -> StorageResult<Self> {
        let (client, connection) = tokio_postgres::connect(&config.connection_string(), NoTls)
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;

        // Spawn connection in background
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        Ok(Self { client })
    }
}

fn row_to_task(row: &Row) -> StorageResult<TaskRecord> {
    let status_text: String = row.get(7);
    let status = status_text
        .parse::<TaskStatus>()
        .map_err(|e| StorageError::InvalidRecord(e.to_string()))?;

    Ok(TaskRecord {
        task_id: row.get(0),
        lecture_title: row.get(1),
        video_url: row.get(2),
        download_url: row.get(3),
        file_name: row.get(4),
        file_size: row.get(5),
        mime_type: row.get(6),
        status,
        error_message: row.get(8),
        pdf_url: row.get(9),
        created_at: row.get(10),
    })
}

const TASK_COLUMNS: &str = "task_id, lecture_title, video_url, download_url, \
     file_name, file_size, mime_type, status, error_message, pdf_url, created_at";

#[async_trait::async_trait]
impl TaskStore for PostgresTaskStore {
    async fn init_schema(&self) -> StorageResult<()> {
        self.client
            .execute(
                r"
                CREATE TABLE IF NOT EXISTS tasks (
                    task_id TEXT PRIMARY KEY,
                    lecture_title TEXT NOT NULL,
                    video_url TEXT NOT NULL,
                    download_url TEXT NOT NULL,
                    file_name TEXT,
                    file_size BIGINT,
                    mime_type TEXT,
                    status TEXT NOT NULL,
                    error_message TEXT,
                    pdf_url TEXT,
                    created_at TIMESTAMP WITH TIME ZONE NOT NULL
                )
                ",
                &[],
            )
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;

        self.client
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at DESC)",
                &[],
            )
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;

        self.client
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status)",
                &[],
            )
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;

        tracing::info!("PostgreSQL schema initialized");

        Ok(())
    }

    async fn insert(&self, task: &TaskRecord) -> StorageResult<()> {
        let status = task.status.as_str();

        self.client
            .execute(
                r"
                INSERT INTO tasks
                (task_id, lecture_title, video_url, download_url,
                 file_name, file_size, mime_type, status, error_message, pdf_url, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                ",
                &[
                    &task.task_id,
                    &task.lecture_title,
                    &task.video_url,
                    &task.download_url,
                    &task.file_name,
                    &task.file_size,
                    &task.mime_type,
                    &status,
                    &task.error_message,
                    &task.pdf_url,
                    &task.created_at,
                ],
            )
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, task_id: &str) -> StorageResult<TaskRecord> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE task_id = $1");
        let row = self
            .client
            .query_one(query.as_str(), &[&task_id])
            .await
            .map_err(|e| {
                if e.to_string().contains("no rows") {
                    StorageError::NotFound(task_id.to_string())
                } else {
                    StorageError::PostgresError(e.to_string())
                }
            })?;

        row_to_task(&row)
    }

    async fn list(&self) -> StorageResult<Vec<TaskRecord>> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at DESC");
        let rows = self
            .client
            .query(query.as_str(), &[])
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;

        rows.iter().map(row_to_task).collect()
    }

    async fn mark_in_progress(&self, task_id: &str) -> StorageResult<()> {
        let updated = self
            .client
            .execute(
                r"
                UPDATE tasks SET status = 'InProgress'
                WHERE task_id = $1 AND status NOT IN ('Error', 'Completed')
                ",
                &[&task_id],
            )
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;

        if updated == 0 {
            debug!("Task {} not moved to InProgress (missing or terminal)", task_id);
        }

        Ok(())
    }

    async fn mark_error(&self, task_id: &str, message: &str) -> StorageResult<()> {
        let updated = self
            .client
            .execute(
                r"
                UPDATE tasks SET status = 'Error', error_message = $2
                WHERE task_id = $1 AND status NOT IN ('Error', 'Completed')
                ",
                &[&task_id, &message],
            )
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;

        if updated == 0 {
            debug!("Task {} not moved to Error (missing or terminal)", task_id);
        }

        Ok(())
    }

    async fn mark_completed(&self, task_id: &str, pdf_url: &str) -> StorageResult<()> {
        let updated = self
            .client
            .execute(
                r"
                UPDATE tasks SET status = 'Completed', pdf_url = $2
                WHERE task_id = $1 AND status NOT IN ('Error', 'Completed')
                ",
                &[&task_id, &pdf_url],
            )
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;

        if updated == 0 {
            debug!("Task {} not moved to Completed (missing or terminal)", task_id);
        }

        Ok(())
    }

    async fn lecture_title(&self, task_id: &str) -> StorageResult<String> {
        let row = self
            .client
            .query_one(
                "SELECT lecture_title FROM tasks WHERE task_id = $1",
                &[&task_id],
            )
            .await
            .map_err(|e| {
                if e.to_string().contains("no rows") {
                    StorageError::NotFound(task_id.to_string())
                } else {
                    StorageError::PostgresError(e.to_string())
                }
            })?;

        Ok(row.get(0))
    }
}

/// In-memory task store used by handler and pipeline tests
#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: tokio::sync::Mutex<HashMap<String, TaskRecord>>,
}

impl MemoryTaskStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn update<F: FnOnce(&mut TaskRecord)>(
        &self,
        task_id: &str,
        apply: F,
    ) -> StorageResult<()> {
        let mut tasks = self.tasks.lock().await;
        match tasks.get_mut(task_id) {
            Some(task) if !task.status.is_terminal() => apply(task),
            Some(_) => debug!("Task {} is terminal, leaving it unchanged", task_id),
            None => debug!("Task {} not found, nothing to update", task_id),
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl TaskStore for MemoryTaskStore {
    async fn init_schema(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn insert(&self, task: &TaskRecord) -> StorageResult<()> {
        let mut tasks = self.tasks.lock().await;
        tasks.insert(task.task_id.clone(), task.clone());
        Ok(())
    }

    async fn get(&self, task_id: &str) -> StorageResult<TaskRecord> {
        let tasks = self.tasks.lock().await;
        tasks
            .get(task_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(task_id.to_string()))
    }

    async fn list(&self) -> StorageResult<Vec<TaskRecord>> {
        let tasks = self.tasks.lock().await;
        let mut all: Vec<TaskRecord> = tasks.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn mark_in_progress(&self, task_id: &str) -> StorageResult<()> {
        self.update(task_id, |task| {
            task.status = TaskStatus::InProgress;
        })
        .await
    }

    async fn mark_error(&self, task_id: &str, message: &str) -> StorageResult<()> {
        self.update(task_id, |task| {
            task.status = TaskStatus::Error;
            task.error_message = Some(message.to_string());
        })
        .await
    }

    async fn mark_completed(&self, task_id: &str, pdf_url: &str) -> StorageResult<()> {
        self.update(task_id, |task| {
            task.status = TaskStatus::Completed;
            task.pdf_url = Some(pdf_url.to_string());
        })
        .await
    }

    async fn lecture_title(&self, task_id: &str) -> StorageResult<String> {
        Ok(self.get(task_id).await?.lecture_title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task(task_id: &str) -> TaskRecord {
        TaskRecord::queued(
            task_id.to_string(),
            "Linear Algebra, Lecture 3".to_string(),
            "https://share.example.com/d/abc".to_string(),
            "https://downloader.example.com/abc".to_string(),
        )
    }

    #[test]
    fn test_postgres_connection_string() {
        let config = PostgresConfig {
            host: "localhost".to_string(),
            port: 5432,
            database: "testdb".to_string(),
            user: "testuser".to_string(),
            password: "testpass".to_string(),
        };

        let conn_str = config.connection_string();
        assert!(conn_str.contains("host=localhost"));
        assert!(conn_str.contains("port=5432"));
        assert!(conn_str.contains("dbname=testdb"));
        assert!(conn_str.contains("user=testuser"));
        assert!(conn_str.contains("password=testpass"));
    }

    #[tokio::test]
    async fn test_memory_insert_and_get() {
        let store = MemoryTaskStore::new();
        store.insert(&sample_task("t-1")).await.unwrap();

        let task = store.get("t-1").await.unwrap();
        assert_eq!(task.lecture_title, "Linear Algebra, Lecture 3");
        assert_eq!(task.status, TaskStatus::Queued);

        let title = store.lecture_title("t-1").await.unwrap();
        assert_eq!(title, "Linear Algebra, Lecture 3");
    }

    #[tokio::test]
    async fn test_memory_missing_task() {
        let store = MemoryTaskStore::new();
        assert!(matches!(
            store.get("missing").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_list_orders_newest_first() {
        let store = MemoryTaskStore::new();

        let mut older = sample_task("t-old");
        older.created_at -= chrono::Duration::seconds(60);
        store.insert(&older).await.unwrap();
        store.insert(&sample_task("t-new")).await.unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].task_id, "t-new");
        assert_eq!(all[1].task_id, "t-old");
    }

    #[tokio::test]
    async fn test_memory_completed_sets_pdf_url() {
        let store = MemoryTaskStore::new();
        store.insert(&sample_task("t-1")).await.unwrap();

        store.mark_in_progress("t-1").await.unwrap();
        assert_eq!(
            store.get("t-1").await.unwrap().status,
            TaskStatus::InProgress
        );

        store
            .mark_completed("t-1", "memory://lecture-notes/notes/t-1.pdf")
            .await
            .unwrap();

        let task = store.get("t-1").await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(
            task.pdf_url.as_deref(),
            Some("memory://lecture-notes/notes/t-1.pdf")
        );
    }

    #[tokio::test]
    async fn test_memory_terminal_status_is_preserved() {
        let store = MemoryTaskStore::new();
        store.insert(&sample_task("t-1")).await.unwrap();

        store.mark_error("t-1", "Video download failed").await.unwrap();

        store.mark_in_progress("t-1").await.unwrap();
        store
            .mark_completed("t-1", "memory://lecture-notes/notes/t-1.pdf")
            .await
            .unwrap();

        let task = store.get("t-1").await.unwrap();
        assert_eq!(task.status, TaskStatus::Error);
        assert_eq!(task.error_message.as_deref(), Some("Video download failed"));
        assert_eq!(task.pdf_url, None);
    }
}
