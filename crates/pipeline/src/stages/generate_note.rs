//! Note generation stage
//!
//! The only stage that reads a task field it did not receive in its message:
//! the lecture title comes from the task record, the transcript from storage.
//! Generation failures are terminal; the completion call is too expensive to
//! retry blindly.

use std::sync::Arc;

use anyhow::Context;
use lecture_notes_notegen::{NoteRenderer, Summarizer};
use lecture_notes_storage::{ArtifactKind, ObjectStore, TaskStore};

use crate::stages::StageOutcome;

pub struct GenerateNoteStage {
    objects: Arc<dyn ObjectStore>,
    tasks: Arc<dyn TaskStore>,
    summarizer: Arc<dyn Summarizer>,
    renderer: Arc<dyn NoteRenderer>,
}

impl GenerateNoteStage {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        tasks: Arc<dyn TaskStore>,
        summarizer: Arc<dyn Summarizer>,
        renderer: Arc<dyn NoteRenderer>,
    ) -> Self {
        Self {
            objects,
            tasks,
            summarizer,
            renderer,
        }
    }

    pub async fn run(&self, task_id: &str, storage_url: &str) -> StageOutcome {
        match self.generate(task_id, storage_url).await {
            Ok(pdf_url) => StageOutcome::Complete { pdf_url },
            Err(e) => {
                tracing::error!("Note generation for task {} failed: {:#}", task_id, e);
                StageOutcome::Terminate {
                    reason: format!("Note generation failed: {e}"),
                }
            }
        }
    }

    async fn generate(&self, task_id: &str, storage_url: &str) -> anyhow::Result<String> {
        let transcript_bytes = self.objects.get(storage_url).await?;
        let transcript =
            String::from_utf8(transcript_bytes).context("Transcript is not valid UTF-8")?;

        let lecture_title = self.tasks.lecture_title(task_id).await?;
        let markdown = self
            .summarizer
            .summarize(&lecture_title, &transcript)
            .await?;
        let pdf = self.renderer.render(&markdown)?;

        let pdf_url = self.objects.put(ArtifactKind::Note, task_id, pdf).await?;
        tracing::info!("Note PDF stored for task {}", task_id);
        Ok(pdf_url)
    }
}
