//! Recognition submission stage
//!
//! Transcription runs as an asynchronous job on the speech service; this
//! stage only starts it. The service fetches the audio itself through a
//! time-limited presigned link, so no worker slot is held while minutes of
//! audio are recognized.

use std::sync::Arc;
use std::time::Duration;

use lecture_notes_common::StageMessage;
use lecture_notes_speech::Transcriber;
use lecture_notes_storage::ObjectStore;

use crate::stages::StageOutcome;

pub struct SubmitRecognitionStage {
    objects: Arc<dyn ObjectStore>,
    transcriber: Arc<dyn Transcriber>,
    presign_expiry: Duration,
}

impl SubmitRecognitionStage {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        transcriber: Arc<dyn Transcriber>,
        presign_expiry: Duration,
    ) -> Self {
        Self {
            objects,
            transcriber,
            presign_expiry,
        }
    }

    pub async fn run(&self, task_id: &str, storage_url: &str) -> StageOutcome {
        match self.submit(storage_url).await {
            Ok(operation_id) => {
                tracing::info!(
                    "Recognition operation {} started for task {}",
                    operation_id,
                    task_id
                );
                StageOutcome::Advance(StageMessage::CheckRecognition {
                    task_id: task_id.to_string(),
                    operation_id,
                    attempt: 1,
                })
            }
            Err(e) => {
                tracing::error!("Recognition submission for task {} failed: {:#}", task_id, e);
                StageOutcome::Terminate {
                    reason: format!("Could not start transcription: {e}"),
                }
            }
        }
    }

    async fn submit(&self, storage_url: &str) -> anyhow::Result<String> {
        let audio_url = self
            .objects
            .presign_get(storage_url, self.presign_expiry)
            .await?;
        let operation_id = self.transcriber.submit(&audio_url).await?;
        Ok(operation_id)
    }
}
