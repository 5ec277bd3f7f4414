//! In-memory task queue used by pipeline tests
//!
//! Mirrors the SQS contract closely enough for end-to-end tests: delayed
//! messages stay invisible until due, and delivered messages stay invisible
//! until acknowledged. There is no visibility timeout; tests drive redelivery
//! explicitly.

use crate::{Delivery, QueueResult, TaskQueue, MAX_DELAY};
use lecture_notes_common::StageMessage;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

struct Scheduled {
    visible_at: Instant,
    body: String,
}

// Reversed ordering so the heap yields the earliest visible_at first
impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        other.visible_at.cmp(&self.visible_at)
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.visible_at == other.visible_at
    }
}

impl Eq for Scheduled {}

#[derive(Default)]
struct QueueState {
    scheduled: BinaryHeap<Scheduled>,
    ready: VecDeque<String>,
    in_flight: HashMap<String, String>,
    next_id: u64,
}

impl QueueState {
    fn promote_due(&mut self, now: Instant) {
        while self
            .scheduled
            .peek()
            .is_some_and(|first| first.visible_at <= now)
        {
            if let Some(message) = self.scheduled.pop() {
                self.ready.push_back(message.body);
            }
        }
    }
}

/// In-memory task queue
#[derive(Default)]
pub struct MemoryQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl MemoryQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages waiting or scheduled, excluding in-flight deliveries
    pub async fn pending(&self) -> usize {
        let state = self.state.lock().await;
        state.ready.len() + state.scheduled.len()
    }

    /// Number of delivered but unacknowledged messages
    pub async fn in_flight(&self) -> usize {
        let state = self.state.lock().await;
        state.in_flight.len()
    }
}

#[async_trait::async_trait]
impl TaskQueue for MemoryQueue {
    async fn send(&self, message: &StageMessage, delay: Duration) -> QueueResult<String> {
        let body = serde_json::to_string(message)?;

        let mut state = self.state.lock().await;
        let id = state.next_id;
        state.next_id += 1;

        if delay.is_zero() {
            state.ready.push_back(body);
        } else {
            state.scheduled.push(Scheduled {
                visible_at: Instant::now() + delay.min(MAX_DELAY),
                body,
            });
        }
        drop(state);

        self.notify.notify_one();
        Ok(format!("mem-{id}"))
    }

    async fn receive(&self, max_messages: i32, wait: Duration) -> QueueResult<Vec<Delivery>> {
        let deadline = Instant::now() + wait;
        let max_messages = max_messages.max(1) as usize;

        loop {
            let (deliveries, next_due) = {
                let mut state = self.state.lock().await;
                state.promote_due(Instant::now());

                let mut deliveries = Vec::new();
                while deliveries.len() < max_messages {
                    let Some(body) = state.ready.pop_front() else {
                        break;
                    };
                    let receipt = format!("rcpt-{}", state.next_id);
                    state.next_id += 1;
                    state.in_flight.insert(receipt.clone(), body.clone());
                    deliveries.push(Delivery { body, receipt });
                }

                let next_due = state.scheduled.peek().map(|first| first.visible_at);
                (deliveries, next_due)
            };

            if !deliveries.is_empty() {
                return Ok(deliveries);
            }

            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }

            let wake_at = match next_due {
                Some(due) => due.min(deadline),
                None => deadline,
            };

            tokio::select! {
                () = self.notify.notified() => {}
                () = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    async fn acknowledge(&self, delivery: &Delivery) -> QueueResult<()> {
        let mut state = self.state.lock().await;
        state.in_flight.remove(&delivery.receipt);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn download_message(task_id: &str) -> StageMessage {
        StageMessage::Download {
            task_id: task_id.to_string(),
            download_url: format!("https://downloader.example.com/{task_id}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_receive_acknowledge() {
        let queue = MemoryQueue::new();
        queue
            .send(&download_message("t-1"), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(queue.pending().await, 1);

        let deliveries = queue.receive(10, Duration::ZERO).await.unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(queue.pending().await, 0);
        assert_eq!(queue.in_flight().await, 1);

        let message: StageMessage = serde_json::from_str(&deliveries[0].body).unwrap();
        assert_eq!(message.task_id(), "t-1");

        queue.acknowledge(&deliveries[0]).await.unwrap();
        assert_eq!(queue.in_flight().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_message_is_invisible_until_due() {
        let queue = MemoryQueue::new();
        queue
            .send(&download_message("t-1"), Duration::from_secs(5))
            .await
            .unwrap();

        let deliveries = queue.receive(10, Duration::ZERO).await.unwrap();
        assert!(deliveries.is_empty());

        tokio::time::advance(Duration::from_secs(5)).await;

        let deliveries = queue.receive(10, Duration::ZERO).await.unwrap();
        assert_eq!(deliveries.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_wakes_when_delayed_message_comes_due() {
        let queue = MemoryQueue::new();
        queue
            .send(&download_message("t-1"), Duration::from_secs(3))
            .await
            .unwrap();

        let started = Instant::now();
        let deliveries = queue.receive(10, Duration::from_secs(20)).await.unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_respects_batch_limit() {
        let queue = MemoryQueue::new();
        for i in 0..12 {
            queue
                .send(&download_message(&format!("t-{i}")), Duration::ZERO)
                .await
                .unwrap();
        }

        let deliveries = queue.receive(10, Duration::ZERO).await.unwrap();
        assert_eq!(deliveries.len(), 10);
        assert_eq!(queue.pending().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_receive_returns_after_wait() {
        let queue = MemoryQueue::new();

        let started = Instant::now();
        let deliveries = queue.receive(10, Duration::from_secs(2)).await.unwrap();
        assert!(deliveries.is_empty());
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }
}
