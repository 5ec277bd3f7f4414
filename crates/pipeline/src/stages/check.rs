//! Recognition polling stage
//!
//! A self-re-enqueueing poll loop with no persistent worker: each invocation
//! checks the operation once and either advances, schedules the next check
//! through the queue's delay mechanism, or fails the task. The delay doubles
//! per attempt up to the queue's maximum, and a configurable attempt ceiling
//! keeps a stuck operation from polling forever.

use std::sync::Arc;

use lecture_notes_common::StageMessage;
use lecture_notes_queue::poll_delay;
use lecture_notes_speech::{assemble_transcript, OperationStatus, Transcriber};
use lecture_notes_storage::{ArtifactKind, ObjectStore};

use crate::stages::StageOutcome;

pub struct CheckRecognitionStage {
    objects: Arc<dyn ObjectStore>,
    transcriber: Arc<dyn Transcriber>,
    max_poll_attempts: u32,
}

impl CheckRecognitionStage {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        transcriber: Arc<dyn Transcriber>,
        max_poll_attempts: u32,
    ) -> Self {
        Self {
            objects,
            transcriber,
            max_poll_attempts,
        }
    }

    pub async fn run(&self, task_id: &str, operation_id: &str, attempt: u32) -> StageOutcome {
        match self.transcriber.status(operation_id).await {
            Ok(OperationStatus::Done) => match self.store_transcript(task_id, operation_id).await {
                Ok(storage_url) => {
                    tracing::info!("Transcript stored for task {}", task_id);
                    StageOutcome::Advance(StageMessage::GenerateNote {
                        task_id: task_id.to_string(),
                        storage_url,
                    })
                }
                Err(e) => {
                    tracing::error!("Transcript retrieval for task {} failed: {:#}", task_id, e);
                    StageOutcome::Terminate {
                        reason: format!("Transcription failed: {e}"),
                    }
                }
            },
            Ok(OperationStatus::Running) => {
                if attempt >= self.max_poll_attempts {
                    return StageOutcome::Terminate {
                        reason: format!(
                            "Transcription did not finish after {attempt} status checks"
                        ),
                    };
                }
                let delay = poll_delay(attempt);
                tracing::debug!(
                    "Operation {} still running, next check for task {} in {}s",
                    operation_id,
                    task_id,
                    delay.as_secs()
                );
                StageOutcome::Retry {
                    delay,
                    message: StageMessage::CheckRecognition {
                        task_id: task_id.to_string(),
                        operation_id: operation_id.to_string(),
                        attempt: attempt + 1,
                    },
                }
            }
            Ok(OperationStatus::Failed { message }) => StageOutcome::Terminate {
                reason: format!("Transcription failed: {message}"),
            },
            Err(e) => {
                tracing::error!("Status check for task {} failed: {:#}", task_id, e);
                StageOutcome::Terminate {
                    reason: format!("Transcription failed: {e}"),
                }
            }
        }
    }

    async fn store_transcript(&self, task_id: &str, operation_id: &str) -> anyhow::Result<String> {
        let fragments = self.transcriber.fetch_result(operation_id).await?;
        let transcript = assemble_transcript(&fragments);
        let storage_url = self
            .objects
            .put(ArtifactKind::Transcript, task_id, transcript.into_bytes())
            .await?;
        Ok(storage_url)
    }
}
