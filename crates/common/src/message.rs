//! Cross-stage queue messages
//!
//! Every message names its consuming stage through the `kind` tag, so a body
//! that does not match any stage fails to decode instead of being routed on
//! guesswork.

use serde::{Deserialize, Serialize};

/// Message passed between pipeline stages through the task queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageMessage {
    /// Fetch the source video and stage it in object storage
    Download { task_id: String, download_url: String },

    /// Transcode the staged video into an MP3 track
    ExtractAudio { task_id: String, storage_url: String },

    /// Submit the stored audio to the transcription service
    SubmitRecognition { task_id: String, storage_url: String },

    /// Poll a transcription operation until it settles
    CheckRecognition {
        task_id: String,
        operation_id: String,
        attempt: u32,
    },

    /// Summarize the transcript and render the PDF note
    GenerateNote { task_id: String, storage_url: String },
}

impl StageMessage {
    /// Task this message belongs to
    #[must_use]
    pub fn task_id(&self) -> &str {
        match self {
            StageMessage::Download { task_id, .. }
            | StageMessage::ExtractAudio { task_id, .. }
            | StageMessage::SubmitRecognition { task_id, .. }
            | StageMessage::CheckRecognition { task_id, .. }
            | StageMessage::GenerateNote { task_id, .. } => task_id,
        }
    }

    /// Stage name for logs
    #[must_use]
    pub fn stage_name(&self) -> &'static str {
        match self {
            StageMessage::Download { .. } => "download",
            StageMessage::ExtractAudio { .. } => "extract_audio",
            StageMessage::SubmitRecognition { .. } => "submit_recognition",
            StageMessage::CheckRecognition { .. } => "check_recognition",
            StageMessage::GenerateNote { .. } => "generate_note",
        }
    }
}
