//! HTTP request handlers for API endpoints

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::source::{SourceError, SourceProbe};
use crate::types::{
    CreateTaskRequest, CreateTaskResponse, ErrorResponse, HealthResponse, TaskListItem,
    TaskSummary,
};
use crate::ApiState;
use lecture_notes_common::{StageMessage, TaskRecord};
use lecture_notes_queue::TaskQueue;
use lecture_notes_storage::{ObjectStore, TaskStore};

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Accept a lecture video for processing
///
/// Validates the submission, probes the share link, stores the task row
/// and sends the first pipeline message before responding.
pub async fn create_task(
    State(state): State<ApiState>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<Json<CreateTaskResponse>, ApiError> {
    let lecture_title = match request.lecture_title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => return Err(bad_request("The lectureTitle field is required")),
    };
    let video_url = match request.video_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => return Err(bad_request("The videoUrl field is required")),
    };

    let probed = match state.source.probe(&video_url).await {
        Ok(probed) => probed,
        Err(e) => {
            warn!("Rejected share link {}: {}", video_url, e);
            return Err(source_error(&e));
        }
    };

    let task_id = Uuid::new_v4().to_string();
    info!("Accepted task {} for lecture {:?}", task_id, lecture_title);

    let mut task = TaskRecord::queued(
        task_id,
        lecture_title,
        video_url,
        probed.download_url.clone(),
    );
    task.file_name = non_empty(probed.file_name);
    task.file_size = Some(probed.file_size);
    task.mime_type = non_empty(probed.mime_type);

    state.tasks.insert(&task).await.map_err(|e| {
        error!("Failed to store task {}: {}", task.task_id, e);
        internal_error()
    })?;

    let message = StageMessage::Download {
        task_id: task.task_id.clone(),
        download_url: probed.download_url,
    };
    let queue_message_id = match state.queue.send(&message, Duration::ZERO).await {
        Ok(message_id) => message_id,
        Err(e) => {
            error!("Failed to enqueue task {}: {}", task.task_id, e);
            if let Err(e) = state
                .tasks
                .mark_error(&task.task_id, "The task could not be enqueued")
                .await
            {
                error!("Failed to mark task {} as failed: {}", task.task_id, e);
            }
            return Err(internal_error());
        }
    };

    Ok(Json(CreateTaskResponse {
        success: true,
        message: "The video has been accepted for processing".to_string(),
        task: TaskSummary {
            id: task.task_id,
            lecture_title: task.lecture_title,
            status: task.status,
            created_at: task.created_at.to_rfc3339(),
            queue_message_id,
        },
    }))
}

/// List all tasks, newest first
///
/// Stored note URLs are converted to time-limited presigned links at read
/// time; a task whose note cannot be presigned is listed without one.
pub async fn list_tasks(
    State(state): State<ApiState>,
) -> Result<Json<Vec<TaskListItem>>, ApiError> {
    let tasks = state.tasks.list().await.map_err(|e| {
        error!("Failed to list tasks: {}", e);
        internal_error()
    })?;

    let mut items = Vec::with_capacity(tasks.len());
    for task in tasks {
        let pdf_url = match task.pdf_url.as_deref() {
            Some(stored) => match state.objects.presign_get(stored, state.presign_expiry).await {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!("Could not presign note for task {}: {}", task.task_id, e);
                    None
                }
            },
            None => None,
        };
        items.push(TaskListItem {
            task_id: task.task_id,
            lecture_title: task.lecture_title,
            video_url: task.video_url,
            status: task.status,
            created_at: task.created_at.to_rfc3339(),
            pdf_url,
            error_message: task.error_message,
        });
    }
    Ok(Json(items))
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn bad_request(message: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            success: false,
            error: message.to_string(),
        }),
    )
}

fn source_error(error: &SourceError) -> ApiError {
    match error {
        SourceError::Http(_) | SourceError::Status(_) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                success: false,
                error: "The shared video could not be checked, try again later".to_string(),
            }),
        ),
        _ => bad_request(&error.to_string()),
    }
}

fn internal_error() -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            success: false,
            error: "Internal server error".to_string(),
        }),
    )
}
