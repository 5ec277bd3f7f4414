//! Task queue implementation using SQS
//!
//! Works against AWS SQS and SQS-compatible services (`ElasticMQ`, `LocalStack`).
//! FIFO queues are detected from the queue URL and get a fixed message group
//! plus a fresh deduplication id per send.

use crate::{Delivery, QueueError, QueueResult, TaskQueue, MAX_DELAY};
use aws_sdk_sqs::{
    config::{Credentials, Region},
    Client,
};
use lecture_notes_common::StageMessage;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Message group for FIFO queues
const MESSAGE_GROUP: &str = "lecture-notes";

fn is_fifo(queue_url: &str) -> bool {
    queue_url.ends_with(".fifo")
}

/// SQS configuration
#[derive(Debug, Clone)]
pub struct SqsConfig {
    /// Full queue URL
    pub queue_url: String,

    /// AWS region
    pub region: String,

    /// SQS endpoint (custom for `ElasticMQ`/`LocalStack`, `None` for AWS)
    pub endpoint: Option<String>,

    /// AWS access key ID
    pub access_key_id: String,

    /// AWS secret access key
    pub secret_access_key: String,

    /// Seconds a received message stays invisible before redelivery
    pub visibility_timeout: u32,
}

/// SQS task queue implementation
pub struct SqsQueue {
    client: Client,
    queue_url: String,
    fifo: bool,
    visibility_timeout: u32,
}

impl SqsQueue {
    /// Create a new SQS task queue client
    pub async fn new(config: SqsConfig) -> QueueResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "lecture-notes-queue",
        );

        let region = Region::new(config.region.clone());

        let mut sqs_config_builder = aws_sdk_sqs::Config::builder()
            .credentials_provider(credentials)
            .region(region)
            .behavior_version_latest();

        if let Some(endpoint) = config.endpoint {
            sqs_config_builder = sqs_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(sqs_config_builder.build());
        let fifo = is_fifo(&config.queue_url);

        Ok(Self {
            client,
            queue_url: config.queue_url,
            fifo,
            visibility_timeout: config.visibility_timeout,
        })
    }
}

#[async_trait::async_trait]
impl TaskQueue for SqsQueue {
    async fn send(&self, message: &StageMessage, delay: Duration) -> QueueResult<String> {
        let body = serde_json::to_string(message)?;

        let mut request = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body);

        if self.fifo {
            request = request
                .message_group_id(MESSAGE_GROUP)
                .message_deduplication_id(Uuid::new_v4().to_string());
        }

        if !delay.is_zero() {
            if self.fifo {
                // FIFO queues reject per-message delays
                debug!("Dropping {:?} delay for FIFO queue send", delay);
            } else {
                let delay = delay.min(MAX_DELAY);
                request = request.delay_seconds(delay.as_secs() as i32);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| QueueError::SqsError(e.to_string()))?;

        Ok(response.message_id().unwrap_or_default().to_string())
    }

    async fn receive(&self, max_messages: i32, wait: Duration) -> QueueResult<Vec<Delivery>> {
        let response = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages.clamp(1, 10))
            .wait_time_seconds(wait.as_secs().min(20) as i32)
            .visibility_timeout(self.visibility_timeout as i32)
            .send()
            .await
            .map_err(|e| QueueError::SqsError(e.to_string()))?;

        let deliveries = response
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|message| {
                let body = message.body?;
                let receipt = message.receipt_handle?;
                Some(Delivery { body, receipt })
            })
            .collect();

        Ok(deliveries)
    }

    async fn acknowledge(&self, delivery: &Delivery) -> QueueResult<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(&delivery.receipt)
            .send()
            .await
            .map_err(|e| QueueError::SqsError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_detection_from_queue_url() {
        assert!(!is_fifo(
            "https://sqs.us-east-1.amazonaws.com/123/lecture-tasks"
        ));
        assert!(is_fifo(
            "https://sqs.us-east-1.amazonaws.com/123/lecture-tasks.fifo"
        ));
        assert!(!is_fifo("http://localhost:9324/queue/lecture-tasks"));
    }

    #[tokio::test]
    async fn test_queue_client_marks_fifo() {
        let config = SqsConfig {
            queue_url: "http://localhost:9324/queue/lecture-tasks.fifo".to_string(),
            region: "us-east-1".to_string(),
            endpoint: Some("http://localhost:9324".to_string()),
            access_key_id: "x".to_string(),
            secret_access_key: "x".to_string(),
            visibility_timeout: 300,
        };

        let queue = SqsQueue::new(config).await.unwrap();
        assert!(queue.fifo);
        assert_eq!(queue.visibility_timeout, 300);
    }
}
