//! Audio extraction stage
//!
//! Temp files live in one scoped directory so both the downloaded video and
//! the extracted MP3 are removed on every exit path.

use std::sync::Arc;

use anyhow::Context;
use lecture_notes_common::StageMessage;
use lecture_notes_storage::{ArtifactKind, ObjectStore};

use crate::stages::StageOutcome;
use crate::transcode::AudioTranscoder;

pub struct ExtractAudioStage {
    objects: Arc<dyn ObjectStore>,
    transcoder: Arc<dyn AudioTranscoder>,
}

impl ExtractAudioStage {
    pub fn new(objects: Arc<dyn ObjectStore>, transcoder: Arc<dyn AudioTranscoder>) -> Self {
        Self {
            objects,
            transcoder,
        }
    }

    pub async fn run(&self, task_id: &str, storage_url: &str) -> StageOutcome {
        match self.extract(task_id, storage_url).await {
            Ok(audio_url) => StageOutcome::Advance(StageMessage::SubmitRecognition {
                task_id: task_id.to_string(),
                storage_url: audio_url,
            }),
            Err(e) => {
                tracing::error!("Audio extraction for task {} failed: {:#}", task_id, e);
                StageOutcome::Terminate {
                    reason: format!("Audio extraction failed: {e}"),
                }
            }
        }
    }

    async fn extract(&self, task_id: &str, storage_url: &str) -> anyhow::Result<String> {
        let temp_dir = tempfile::tempdir().context("Failed to create temporary directory")?;
        let video_path = temp_dir.path().join("video.mp4");
        let audio_path = temp_dir.path().join("audio.mp3");

        self.objects.get_to_path(storage_url, &video_path).await?;
        self.transcoder
            .extract_mp3(&video_path, &audio_path)
            .await?;

        let audio_url = self
            .objects
            .put_file(ArtifactKind::Audio, task_id, &audio_path)
            .await?;

        tracing::info!("Extracted audio for task {}", task_id);
        Ok(audio_url)
    }
}
