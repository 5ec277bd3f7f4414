//! Lecture note generation: transcript in, PDF out
//!
//! A completion service turns the raw transcript into structured markdown
//! notes, and a renderer turns that markdown into a paginated PDF. The two
//! halves sit behind traits so the pipeline can be tested without the
//! external service or a PDF reader.

use thiserror::Error;

pub mod completion;
pub mod pdf;

pub use completion::{CompletionConfig, HttpSummarizer, Summarizer};
pub use pdf::{MarkdownPdfRenderer, NoteRenderer};

/// Note generation errors
#[derive(Error, Debug)]
pub enum NotegenError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed completion response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("Completion response carried no alternatives")]
    EmptyCompletion,

    #[error("PDF rendering failed: {0}")]
    Rendering(String),
}

/// Result type for note generation operations
pub type NotegenResult<T> = Result<T, NotegenError>;
