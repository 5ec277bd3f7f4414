//! Stage executors and the worker loop that drives them.
//!
//! A task moves through five queue-triggered stages: download the video,
//! extract its audio track, submit the audio for speech recognition,
//! poll the recognition operation, and render the lecture note PDF.
//! Each stage reports a [`StageOutcome`]; the dispatcher turns outcomes
//! into queue sends and task-record updates.

pub mod config;
pub mod dispatcher;
pub mod stages;
pub mod transcode;
pub mod worker;

pub use config::WorkerConfig;
pub use dispatcher::{decode, DispatchError, Dispatcher, Stages};
pub use stages::{
    CheckRecognitionStage, DownloadStage, ExtractAudioStage, GenerateNoteStage, StageOutcome,
    SubmitRecognitionStage,
};
pub use transcode::{AudioTranscoder, FfmpegTranscoder, TranscodeError};
pub use worker::Worker;
