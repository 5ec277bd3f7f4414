//! Long-polling worker loop.
//!
//! One worker process serves every stage: it pulls a batch of messages,
//! hands each to the dispatcher, and acknowledges the ones that were
//! fully dispatched. A message whose outcome could not be applied keeps
//! its receipt and reappears after the visibility timeout, so a stage
//! must tolerate running twice for the same task.

use std::sync::Arc;
use std::time::Duration;

use lecture_notes_queue::TaskQueue;

use crate::dispatcher::{DispatchError, Dispatcher};

const RECEIVE_BATCH: i32 = 10;
const RECEIVE_WAIT: Duration = Duration::from_secs(20);

pub struct Worker {
    queue: Arc<dyn TaskQueue>,
    dispatcher: Dispatcher,
}

impl Worker {
    pub fn new(queue: Arc<dyn TaskQueue>, dispatcher: Dispatcher) -> Self {
        Self { queue, dispatcher }
    }

    /// Receive one batch and dispatch it, returning how many messages
    /// were acknowledged.
    ///
    /// A malformed body can never succeed on redelivery, so it is logged
    /// and acknowledged to keep it from cycling through the queue
    /// forever. Queue or storage failures leave the message in flight
    /// for redelivery.
    pub async fn poll_once(&self) -> usize {
        let deliveries = match self.queue.receive(RECEIVE_BATCH, RECEIVE_WAIT).await {
            Ok(deliveries) => deliveries,
            Err(e) => {
                tracing::error!("Failed to receive messages: {}", e);
                return 0;
            }
        };

        let mut acknowledged = 0;
        for delivery in deliveries {
            match self.dispatcher.handle(&delivery.body).await {
                Ok(()) => {}
                Err(DispatchError::Malformed(e)) => {
                    tracing::warn!("Dropping malformed message: {}", e);
                }
                Err(e) => {
                    tracing::error!("Dispatch failed, message will be redelivered: {}", e);
                    continue;
                }
            }
            if let Err(e) = self.queue.acknowledge(&delivery).await {
                tracing::error!("Failed to acknowledge message: {}", e);
                continue;
            }
            acknowledged += 1;
        }
        acknowledged
    }

    /// Poll forever. Runs until the process is stopped.
    pub async fn run(&self) {
        tracing::info!("Worker started");
        loop {
            self.poll_once().await;
        }
    }
}
