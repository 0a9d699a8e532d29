use anyhow::{Context, Result};
use async_trait::async_trait;
use flare_social_core::error::{ErrorCode, InfraResultExt};
use redis::{AsyncCommands, aio::ConnectionManager};
use tracing::info;

use crate::domain::model::ActivityEvent;
use crate::domain::repository::{ActivityQueue, QueuedPayload};

/// 基于 Redis 列表的可靠队列
///
/// 生产者 `LPUSH {queue}`；消费者 `BLMOVE {queue} {queue}:processing:{consumer} RIGHT LEFT`
/// 取出消息并暂存到处理中列表，处理完成后 `LREM` 确认。
/// 进程重启时把处理中列表的消息放回队列，保证至少一次投递。
///
/// `BLMOVE` 会占住所在连接直到超时，因此只在 `blocking_conn` 上执行；
/// 入队、确认与回收走 `conn`，不会排在阻塞读取之后
pub struct RedisActivityQueue {
    conn: ConnectionManager,
    blocking_conn: ConnectionManager,
    queue_key: String,
    processing_key: String,
}

impl RedisActivityQueue {
    pub fn new(
        conn: ConnectionManager,
        blocking_conn: ConnectionManager,
        queue_key: impl Into<String>,
        consumer_id: &str,
    ) -> Self {
        let queue_key = queue_key.into();
        let processing_key = format!("{queue_key}:processing:{consumer_id}");
        Self {
            conn,
            blocking_conn,
            queue_key,
            processing_key,
        }
    }

    pub async fn connect(
        client: &redis::Client,
        queue_key: impl Into<String>,
        consumer_id: &str,
    ) -> Result<Self> {
        let conn = ConnectionManager::new(client.clone())
            .await
            .into_flare(ErrorCode::ServiceUnavailable, "failed to open redis connection")?;
        let blocking_conn = ConnectionManager::new(client.clone())
            .await
            .into_flare(ErrorCode::ServiceUnavailable, "failed to open redis blocking connection")?;
        Ok(Self::new(conn, blocking_conn, queue_key, consumer_id))
    }

    pub fn queue_key(&self) -> &str {
        &self.queue_key
    }
}

#[async_trait]
impl ActivityQueue for RedisActivityQueue {
    async fn enqueue(&self, event: &ActivityEvent) -> Result<()> {
        let payload = serde_json::to_string(event).context("failed to encode activity event")?;
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .lpush(&self.queue_key, payload)
            .await
            .into_flare(ErrorCode::ServiceUnavailable, "failed to enqueue activity event")?;
        Ok(())
    }

    async fn next(&self, timeout_seconds: f64) -> Result<Option<QueuedPayload>> {
        let mut conn = self.blocking_conn.clone();
        let payload: Option<String> = redis::cmd("BLMOVE")
            .arg(&self.queue_key)
            .arg(&self.processing_key)
            .arg("RIGHT")
            .arg("LEFT")
            .arg(timeout_seconds)
            .query_async(&mut conn)
            .await
            .into_flare(ErrorCode::ServiceUnavailable, "failed to pop activity event")?;
        Ok(payload.map(|payload| QueuedPayload { payload }))
    }

    async fn ack(&self, payload: &QueuedPayload) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .lrem(&self.processing_key, 1, &payload.payload)
            .await
            .into_flare(ErrorCode::ServiceUnavailable, "failed to ack activity event")?;
        Ok(())
    }

    async fn requeue_pending(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        let mut moved = 0;
        loop {
            let payload: Option<String> = redis::cmd("LMOVE")
                .arg(&self.processing_key)
                .arg(&self.queue_key)
                .arg("LEFT")
                .arg("RIGHT")
                .query_async(&mut conn)
                .await
                .into_flare(ErrorCode::ServiceUnavailable, "failed to requeue activity event")?;
            if payload.is_none() {
                break;
            }
            moved += 1;
        }
        if moved > 0 {
            info!(queue = %self.queue_key, moved, "Requeued unacknowledged activity events");
        }
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    // 需要 Redis：PRESENCE_TEST_REDIS_URL=redis://127.0.0.1/ cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_ack_is_not_blocked_by_pending_pop() {
        let url = std::env::var("PRESENCE_TEST_REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
        let client = redis::Client::open(url).unwrap();
        let queue = Arc::new(
            RedisActivityQueue::connect(&client, "presence:test:activity_queue", "ack-test")
                .await
                .unwrap(),
        );
        let mut conn = queue.conn.clone();
        let _: () = conn.del(&queue.queue_key).await.unwrap();
        let _: () = conn.del(&queue.processing_key).await.unwrap();

        queue.enqueue(&ActivityEvent::activity("u1")).await.unwrap();
        let taken = queue.next(1.0).await.unwrap().unwrap();

        // 队列已空，下一次读取会阻塞到超时
        let blocked = tokio::spawn({
            let queue = queue.clone();
            async move { queue.next(5.0).await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        tokio::time::timeout(Duration::from_secs(1), queue.ack(&taken))
            .await
            .expect("ack waited behind the blocking pop")
            .unwrap();
        let pending: i64 = conn.llen(&queue.processing_key).await.unwrap();
        assert_eq!(pending, 0);

        queue.enqueue(&ActivityEvent::heartbeat("u2")).await.unwrap();
        let popped = blocked.await.unwrap().unwrap().unwrap();
        queue.ack(&popped).await.unwrap();
    }
}
