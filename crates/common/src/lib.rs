/// Common types for the lecture notes pipeline: the durable task record,
/// its status machine, and the messages stages exchange through the queue.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod env;
pub mod message;

pub use env::{ConfigError, EnvReader};
pub use message::StageMessage;

/// Raised when a stored status string is not part of the lifecycle
#[derive(Debug, Error)]
#[error("unknown task status: {0}")]
pub struct ParseStatusError(String);

/// Lifecycle state of a task
///
/// `Error` and `Completed` are terminal: once a task reaches either, no
/// stage may move it anywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Queued,
    InProgress,
    Error,
    Completed,
}

impl TaskStatus {
    /// String form stored in the database and served over the API
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Queued => "Queued",
            TaskStatus::InProgress => "InProgress",
            TaskStatus::Error => "Error",
            TaskStatus::Completed => "Completed",
        }
    }

    /// Whether this state may never be left again
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Error | TaskStatus::Completed)
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Queued" => Ok(TaskStatus::Queued),
            "InProgress" => Ok(TaskStatus::InProgress),
            "Error" => Ok(TaskStatus::Error),
            "Completed" => Ok(TaskStatus::Completed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable record of one lecture task, the single source of truth every
/// stage converges on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Unique task identifier (UUID v4)
    pub task_id: String,

    /// Title submitted with the lecture, used in the generated note
    pub lecture_title: String,

    /// Share link the user submitted
    pub video_url: String,

    /// Direct download link resolved from the share link at intake
    pub download_url: String,

    /// File name reported by the share-link metadata lookup
    pub file_name: Option<String>,

    /// File size in bytes reported by the metadata lookup
    pub file_size: Option<i64>,

    /// MIME type reported by the metadata lookup
    pub mime_type: Option<String>,

    /// Current lifecycle state
    pub status: TaskStatus,

    /// Human-readable failure description, set only when `status` is `Error`
    pub error_message: Option<String>,

    /// Storage URL of the rendered note, set only on completion
    pub pdf_url: Option<String>,

    /// Server-assigned creation time
    pub created_at: DateTime<Utc>,
}

impl TaskRecord {
    /// Build a freshly accepted task in the `Queued` state
    #[must_use]
    pub fn queued(
        task_id: String,
        lecture_title: String,
        video_url: String,
        download_url: String,
    ) -> Self {
        Self {
            task_id,
            lecture_title,
            video_url,
            download_url,
            file_name: None,
            file_size: None,
            mime_type: None,
            status: TaskStatus::Queued,
            error_message: None,
            pdf_url: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the task has settled and must not change again
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_round_trip() {
        for status in [
            TaskStatus::Queued,
            TaskStatus::InProgress,
            TaskStatus::Error,
            TaskStatus::Completed,
        ] {
            let parsed: TaskStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_task_status_rejects_unknown() {
        assert!("Cancelled".parse::<TaskStatus>().is_err());
        assert!("queued".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_task_status_terminal() {
        assert!(!TaskStatus::Queued.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(TaskStatus::Error.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
    }

    #[test]
    fn test_task_status_serializes_as_api_string() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"InProgress\"");
    }

    #[test]
    fn test_queued_task_record() {
        let task = TaskRecord::queued(
            "task-1".to_string(),
            "Linear Algebra".to_string(),
            "https://disk.example.com/d/abc".to_string(),
            "https://downloader.example.com/abc".to_string(),
        );

        assert_eq!(task.status, TaskStatus::Queued);
        assert!(task.error_message.is_none());
        assert!(task.pdf_url.is_none());
        assert!(!task.is_terminal());
    }
}
