//! Task queue layer for the lecture notes pipeline
//!
//! Stages communicate exclusively through this queue: each stage consumes one
//! message kind and enqueues the next one. The SQS implementation backs
//! production deployments; the in-memory implementation backs tests.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use lecture_notes_common::StageMessage;
//! use lecture_notes_queue::{MemoryQueue, QueueResult, TaskQueue};
//!
//! #[tokio::main]
//! async fn main() -> QueueResult<()> {
//!     let queue = MemoryQueue::new();
//!     let message = StageMessage::Download {
//!         task_id: "t-1".to_string(),
//!         download_url: "https://downloader.example.com/abc".to_string(),
//!     };
//!     queue.send(&message, Duration::ZERO).await?;
//!
//!     for delivery in queue.receive(10, Duration::from_secs(1)).await? {
//!         queue.acknowledge(&delivery).await?;
//!     }
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use lecture_notes_common::StageMessage;
use thiserror::Error;

pub mod memory;
pub mod sqs;

pub use memory::MemoryQueue;
pub use sqs::{SqsConfig, SqsQueue};

/// SQS caps per-message delay at 15 minutes
pub const MAX_DELAY: Duration = Duration::from_secs(900);

/// Queue layer errors
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("SQS error: {0}")]
    SqsError(String),

    #[error("Message serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// One received message, held invisible until acknowledged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Raw message body
    pub body: String,

    /// Receipt handle used to acknowledge this delivery
    pub receipt: String,
}

/// Task queue trait
#[async_trait::async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueue a stage message, optionally delayed, returning the message id
    async fn send(&self, message: &StageMessage, delay: Duration) -> QueueResult<String>;

    /// Receive up to `max_messages` messages, long-polling up to `wait`
    async fn receive(&self, max_messages: i32, wait: Duration) -> QueueResult<Vec<Delivery>>;

    /// Delete a delivered message so it is never redelivered
    async fn acknowledge(&self, delivery: &Delivery) -> QueueResult<()>;
}

/// Backoff before the next recognition status check
///
/// Doubles per attempt and saturates at the queue's maximum delay, so early
/// checks come quickly while long transcriptions settle into quarter-hour
/// polling.
#[must_use]
pub fn poll_delay(attempt: u32) -> Duration {
    let seconds = 2u64
        .checked_pow(attempt)
        .unwrap_or(u64::MAX)
        .min(MAX_DELAY.as_secs());
    Duration::from_secs(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_delay_doubles_per_attempt() {
        assert_eq!(poll_delay(1), Duration::from_secs(2));
        assert_eq!(poll_delay(2), Duration::from_secs(4));
        assert_eq!(poll_delay(3), Duration::from_secs(8));
        assert_eq!(poll_delay(9), Duration::from_secs(512));
    }

    #[test]
    fn test_poll_delay_saturates_at_max() {
        assert_eq!(poll_delay(10), MAX_DELAY);
        assert_eq!(poll_delay(30), MAX_DELAY);
        assert_eq!(poll_delay(64), MAX_DELAY);
        assert_eq!(poll_delay(u32::MAX), MAX_DELAY);
    }
}
