use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use tracing::debug;

use crate::domain::model::Notification;
use crate::domain::repository::Notifier;

/// 通过 Redis Pub/Sub 把通知交给通知服务，不等待投递结果
pub struct RedisNotificationPublisher {
    conn: ConnectionManager,
    channel: String,
}

impl RedisNotificationPublisher {
    pub fn new(conn: ConnectionManager, channel: impl Into<String>) -> Self {
        Self {
            conn,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl Notifier for RedisNotificationPublisher {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let message =
            serde_json::to_string(notification).context("failed to encode notification")?;
        let mut conn = self.conn.clone();
        let receivers: i64 = conn
            .publish(&self.channel, message)
            .await
            .context("failed to publish notification")?;
        debug!(
            user_id = %notification.user_id,
            kind = %notification.kind,
            receivers,
            "Notification published"
        );
        Ok(())
    }
}
