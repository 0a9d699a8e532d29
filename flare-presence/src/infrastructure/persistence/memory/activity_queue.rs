use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::domain::model::ActivityEvent;
use crate::domain::repository::{ActivityQueue, QueuedPayload};

#[derive(Default)]
struct QueueState {
    ready: VecDeque<String>,
    processing: Vec<String>,
}

/// 内存版活跃事件队列，语义与 Redis 列表队列一致
#[derive(Default, Clone)]
pub struct InMemoryActivityQueue {
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
}

impl InMemoryActivityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接投递原始消息（包括无法解析的消息）
    pub async fn push_raw(&self, payload: impl Into<String>) {
        self.state.lock().await.ready.push_back(payload.into());
        self.notify.notify_one();
    }

    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.ready.len()
    }

    pub async fn processing_len(&self) -> usize {
        self.state.lock().await.processing.len()
    }

    async fn pop(&self) -> Option<String> {
        let mut state = self.state.lock().await;
        let payload = state.ready.pop_front()?;
        state.processing.push(payload.clone());
        Some(payload)
    }
}

#[async_trait]
impl ActivityQueue for InMemoryActivityQueue {
    async fn enqueue(&self, event: &ActivityEvent) -> Result<()> {
        let payload = serde_json::to_string(event).context("failed to encode activity event")?;
        self.push_raw(payload).await;
        Ok(())
    }

    async fn next(&self, timeout_seconds: f64) -> Result<Option<QueuedPayload>> {
        if let Some(payload) = self.pop().await {
            return Ok(Some(QueuedPayload { payload }));
        }

        let wait = Duration::from_secs_f64(timeout_seconds.max(0.0));
        if tokio::time::timeout(wait, self.notify.notified()).await.is_err() {
            return Ok(None);
        }
        Ok(self.pop().await.map(|payload| QueuedPayload { payload }))
    }

    async fn ack(&self, payload: &QueuedPayload) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(index) = state.processing.iter().position(|p| *p == payload.payload) {
            state.processing.remove(index);
        }
        Ok(())
    }

    async fn requeue_pending(&self) -> Result<usize> {
        let mut state = self.state.lock().await;
        let pending: Vec<String> = state.processing.drain(..).collect();
        let count = pending.len();
        for payload in pending.into_iter().rev() {
            state.ready.push_front(payload);
        }
        if count > 0 {
            self.notify.notify_one();
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unacked_messages_are_requeued() {
        let queue = InMemoryActivityQueue::new();
        queue.enqueue(&ActivityEvent::activity("u1")).await.unwrap();
        queue.enqueue(&ActivityEvent::heartbeat("u2")).await.unwrap();

        let first = queue.next(0.1).await.unwrap().unwrap();
        let _second = queue.next(0.1).await.unwrap().unwrap();
        queue.ack(&first).await.unwrap();
        assert_eq!(queue.processing_len().await, 1);

        assert_eq!(queue.requeue_pending().await.unwrap(), 1);
        let again = queue.next(0.1).await.unwrap().unwrap();
        assert!(again.payload.contains("u2"));
        assert!(queue.next(0.05).await.unwrap().is_none());
    }
}
