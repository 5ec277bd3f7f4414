//! Stage executors
//!
//! Each stage consumes one queue message, performs its storage and external
//! service calls, and reports what should happen next. Stages absorb their
//! own failures: an error never crosses a stage boundary through the queue,
//! it becomes a `Terminate` outcome that the dispatcher records on the task.

use std::time::Duration;

use lecture_notes_common::StageMessage;

pub mod check;
pub mod download;
pub mod extract_audio;
pub mod generate_note;
pub mod submit;

pub use check::CheckRecognitionStage;
pub use download::DownloadStage;
pub use extract_audio::ExtractAudioStage;
pub use generate_note::GenerateNoteStage;
pub use submit::SubmitRecognitionStage;

/// What a stage invocation decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Enqueue the next stage's message
    Advance(StageMessage),

    /// Re-enqueue a message for this stage after a delay
    Retry {
        delay: Duration,
        message: StageMessage,
    },

    /// The task failed; record the reason and stop
    Terminate { reason: String },

    /// The task finished; record its final artifact
    Complete { pdf_url: String },
}
