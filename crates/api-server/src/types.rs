//! API request and response types

use lecture_notes_common::TaskStatus;
use serde::{Deserialize, Serialize};

/// Task submission request
///
/// Both fields are checked by the handler so a missing field produces a
/// helpful message instead of a bare deserialization error.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Lecture title, used as the note heading
    #[serde(default)]
    pub lecture_title: Option<String>,
    /// Public share link to the lecture video
    #[serde(default)]
    pub video_url: Option<String>,
}

/// Accepted-task summary returned from `POST /tasks`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    /// Task identifier
    pub id: String,
    /// Lecture title as accepted
    pub lecture_title: String,
    /// Initial status
    pub status: TaskStatus,
    /// Creation time, RFC 3339
    pub created_at: String,
    /// Queue message id of the first pipeline message
    pub queue_message_id: String,
}

/// Success envelope for `POST /tasks`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskResponse {
    pub success: bool,
    pub message: String,
    pub task: TaskSummary,
}

/// Failure envelope shared by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// One row of `GET /tasks`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListItem {
    /// Task identifier
    pub task_id: String,
    /// Lecture title
    pub lecture_title: String,
    /// Share link the user submitted
    pub video_url: String,
    /// Current status
    pub status: TaskStatus,
    /// Creation time, RFC 3339
    pub created_at: String,
    /// Presigned link to the rendered note, when completed
    pub pdf_url: Option<String>,
    /// Failure description, when failed
    pub error_message: Option<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_task_request_uses_camel_case() {
        let json = r#"{
            "lectureTitle": "Linear Algebra, Lecture 3",
            "videoUrl": "https://share.example/d/abc"
        }"#;

        let request: CreateTaskRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            request.lecture_title.as_deref(),
            Some("Linear Algebra, Lecture 3")
        );
        assert_eq!(request.video_url.as_deref(), Some("https://share.example/d/abc"));
    }

    #[test]
    fn test_create_task_request_tolerates_missing_fields() {
        let request: CreateTaskRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.lecture_title, None);
        assert_eq!(request.video_url, None);
    }

    #[test]
    fn test_task_summary_serialization_shape() {
        let summary = TaskSummary {
            id: "t-1".to_string(),
            lecture_title: "Linear Algebra".to_string(),
            status: TaskStatus::Queued,
            created_at: "2025-01-15T10:30:00+00:00".to_string(),
            queue_message_id: "m-1".to_string(),
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["id"], "t-1");
        assert_eq!(json["lectureTitle"], "Linear Algebra");
        assert_eq!(json["status"], "Queued");
        assert_eq!(json["createdAt"], "2025-01-15T10:30:00+00:00");
        assert_eq!(json["queueMessageId"], "m-1");
    }

    #[test]
    fn test_task_list_item_serializes_null_for_absent_fields() {
        let item = TaskListItem {
            task_id: "t-1".to_string(),
            lecture_title: "Linear Algebra".to_string(),
            video_url: "https://share.example/d/abc".to_string(),
            status: TaskStatus::InProgress,
            created_at: "2025-01-15T10:30:00+00:00".to_string(),
            pdf_url: None,
            error_message: None,
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["taskId"], "t-1");
        assert_eq!(json["status"], "InProgress");
        assert!(json["pdfUrl"].is_null());
        assert!(json["errorMessage"].is_null());
    }

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            success: false,
            error: "The lectureTitle field is required".to_string(),
        };

        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "The lectureTitle field is required");
    }
}
