//! Routes queue messages to stage executors and applies their outcomes.
//!
//! The dispatcher owns the only code path that touches the queue and the
//! task store on behalf of a finished stage. Stages themselves return a
//! [`StageOutcome`] and never enqueue or update task state directly.

use std::sync::Arc;
use std::time::Duration;

use lecture_notes_common::StageMessage;
use lecture_notes_queue::{QueueError, TaskQueue};
use lecture_notes_storage::{StorageError, TaskStore};
use thiserror::Error;

use crate::stages::{
    CheckRecognitionStage, DownloadStage, ExtractAudioStage, GenerateNoteStage, StageOutcome,
    SubmitRecognitionStage,
};

/// Errors that escape a dispatch cycle.
///
/// Stage failures never surface here: a failed stage terminates its own
/// task. These errors mean the message could not be decoded or the
/// outcome could not be applied.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Malformed stage message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// The five stage executors, wired with their dependencies.
pub struct Stages {
    pub download: DownloadStage,
    pub extract_audio: ExtractAudioStage,
    pub submit: SubmitRecognitionStage,
    pub check: CheckRecognitionStage,
    pub generate_note: GenerateNoteStage,
}

/// Decode a raw queue body into a stage message.
pub fn decode(body: &str) -> Result<StageMessage, DispatchError> {
    Ok(serde_json::from_str(body)?)
}

pub struct Dispatcher {
    queue: Arc<dyn TaskQueue>,
    tasks: Arc<dyn TaskStore>,
    stages: Stages,
}

impl Dispatcher {
    pub fn new(queue: Arc<dyn TaskQueue>, tasks: Arc<dyn TaskStore>, stages: Stages) -> Self {
        Self {
            queue,
            tasks,
            stages,
        }
    }

    /// Run the stage a message addresses and apply its outcome.
    pub async fn handle(&self, body: &str) -> Result<(), DispatchError> {
        let message = decode(body)?;
        let task_id = message.task_id().to_string();
        let stage = message.stage_name();
        tracing::info!("Running stage {} for task {}", stage, task_id);

        let outcome = self.run_stage(message).await;
        apply_outcome(
            self.queue.as_ref(),
            self.tasks.as_ref(),
            &task_id,
            stage,
            outcome,
        )
        .await
    }

    async fn run_stage(&self, message: StageMessage) -> StageOutcome {
        match message {
            StageMessage::Download {
                task_id,
                download_url,
            } => self.stages.download.run(&task_id, &download_url).await,
            StageMessage::ExtractAudio {
                task_id,
                storage_url,
            } => self.stages.extract_audio.run(&task_id, &storage_url).await,
            StageMessage::SubmitRecognition {
                task_id,
                storage_url,
            } => self.stages.submit.run(&task_id, &storage_url).await,
            StageMessage::CheckRecognition {
                task_id,
                operation_id,
                attempt,
            } => {
                self.stages
                    .check
                    .run(&task_id, &operation_id, attempt)
                    .await
            }
            StageMessage::GenerateNote {
                task_id,
                storage_url,
            } => self.stages.generate_note.run(&task_id, &storage_url).await,
        }
    }
}

/// Map a stage outcome onto queue and task-record effects.
async fn apply_outcome(
    queue: &dyn TaskQueue,
    tasks: &dyn TaskStore,
    task_id: &str,
    stage: &str,
    outcome: StageOutcome,
) -> Result<(), DispatchError> {
    match outcome {
        StageOutcome::Advance(next) => {
            queue.send(&next, Duration::ZERO).await?;
        }
        StageOutcome::Retry { delay, message } => {
            tracing::debug!(
                "Stage {} for task {} will retry in {}s",
                stage,
                task_id,
                delay.as_secs()
            );
            queue.send(&message, delay).await?;
        }
        StageOutcome::Terminate { reason } => {
            tracing::warn!("Stage {} for task {} failed: {}", stage, task_id, reason);
            tasks.mark_error(task_id, &reason).await?;
        }
        StageOutcome::Complete { pdf_url } => {
            tracing::info!("Task {} completed", task_id);
            tasks.mark_completed(task_id, &pdf_url).await?;
        }
    }
    Ok(())
}
