//! Transcription service client for the lecture notes pipeline
//!
//! The speech service runs recognition as an asynchronous job: the pipeline
//! submits a readable audio URL, polls the returned operation, and fetches
//! the finished result as newline-delimited JSON fragments which this crate
//! reassembles into a single transcript.

use thiserror::Error;

pub mod client;
pub mod transcript;

pub use client::{HttpTranscriber, SpeechConfig};
pub use transcript::{assemble_transcript, parse_recognition_lines, TranscriptFragment};

/// Speech service errors
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Speech service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed recognition payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// Result type for speech operations
pub type SpeechResult<T> = Result<T, SpeechError>;

/// Observed state of an asynchronous recognition operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    /// Still recognizing; check again later
    Running,

    /// Finished; the result can be fetched
    Done,

    /// Finished with an error reported by the service
    Failed { message: String },
}

/// Transcription service trait
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    /// Start recognition of the audio at a readable URL, returning the
    /// operation id to poll
    async fn submit(&self, audio_url: &str) -> SpeechResult<String>;

    /// Current status of a recognition operation
    async fn status(&self, operation_id: &str) -> SpeechResult<OperationStatus>;

    /// Fetch the fragments of a finished recognition operation
    async fn fetch_result(&self, operation_id: &str) -> SpeechResult<Vec<TranscriptFragment>>;
}
