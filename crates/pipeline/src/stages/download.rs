//! Video download stage
//!
//! First stage to touch a task after intake: marks it `InProgress`, streams
//! the remote file to a scoped temp file, then hands it to the object store,
//! which picks single-shot or multipart upload by size.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures_util::StreamExt;
use lecture_notes_common::StageMessage;
use lecture_notes_storage::{ArtifactKind, ObjectStore, TaskStore};
use tokio::io::AsyncWriteExt;

use crate::stages::StageOutcome;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const READ_TIMEOUT: Duration = Duration::from_secs(60);

pub struct DownloadStage {
    objects: Arc<dyn ObjectStore>,
    tasks: Arc<dyn TaskStore>,
    http: reqwest::Client,
    max_video_bytes: u64,
}

impl DownloadStage {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        tasks: Arc<dyn TaskStore>,
        max_video_bytes: u64,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            objects,
            tasks,
            http,
            max_video_bytes,
        })
    }

    pub async fn run(&self, task_id: &str, download_url: &str) -> StageOutcome {
        if let Err(e) = self.tasks.mark_in_progress(task_id).await {
            return StageOutcome::Terminate {
                reason: format!("Video download failed: {e}"),
            };
        }

        match self.download_and_store(task_id, download_url).await {
            Ok(storage_url) => StageOutcome::Advance(StageMessage::ExtractAudio {
                task_id: task_id.to_string(),
                storage_url,
            }),
            Err(e) => {
                tracing::error!("Video download for task {} failed: {:#}", task_id, e);
                StageOutcome::Terminate {
                    reason: format!("Video download failed: {e}"),
                }
            }
        }
    }

    async fn download_and_store(&self, task_id: &str, download_url: &str) -> anyhow::Result<String> {
        let temp_file = tempfile::Builder::new()
            .prefix("video-")
            .suffix(".mp4")
            .tempfile()
            .context("Failed to create temporary file")?;
        let temp_path = temp_file.path().to_path_buf();

        let response = self
            .http
            .get(download_url)
            .send()
            .await
            .context("Failed to reach the video source")?;

        if !response.status().is_success() {
            anyhow::bail!("source responded with status {}", response.status());
        }

        if let Some(length) = response.content_length() {
            if length > self.max_video_bytes {
                anyhow::bail!(
                    "video is {} bytes, the limit is {} bytes",
                    length,
                    self.max_video_bytes
                );
            }
        }

        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .context("Failed to open temporary file for writing")?;

        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed while reading the video stream")?;
            written += chunk.len() as u64;
            if written > self.max_video_bytes {
                anyhow::bail!("download exceeded the {} byte limit", self.max_video_bytes);
            }
            file.write_all(&chunk)
                .await
                .context("Failed to write video chunk")?;
        }
        file.flush().await.context("Failed to flush video file")?;

        tracing::info!("Downloaded {} bytes for task {}", written, task_id);

        let storage_url = self
            .objects
            .put_file(ArtifactKind::Video, task_id, &temp_path)
            .await?;
        Ok(storage_url)
    }
}
