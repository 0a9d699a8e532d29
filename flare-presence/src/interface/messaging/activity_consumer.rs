//! 活跃事件消费者
//!
//! 从队列取出事件并发处理。处理失败只记录日志与指标，不重试，
//! 每条消息处理结束后都会确认。

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use flare_social_core::metrics::PresenceMetrics;
use tokio::sync::{Semaphore, watch};
use tracing::{debug, error, info, warn};

use crate::application::commands::RecordActivityCommand;
use crate::application::handlers::PresenceCommandHandler;
use crate::domain::model::ActivityEvent;
use crate::domain::repository::{ActivityQueue, QueuedPayload};

/// 单条消息的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Processed,
    Failed,
    Malformed,
}

pub struct ActivityEventConsumer {
    queue: Arc<dyn ActivityQueue>,
    command_handler: Arc<PresenceCommandHandler>,
    metrics: Arc<PresenceMetrics>,
    concurrency: usize,
    poll_timeout_seconds: f64,
}

impl ActivityEventConsumer {
    pub fn new(
        queue: Arc<dyn ActivityQueue>,
        command_handler: Arc<PresenceCommandHandler>,
        metrics: Arc<PresenceMetrics>,
        concurrency: usize,
    ) -> Self {
        Self {
            queue,
            command_handler,
            metrics,
            concurrency: concurrency.max(1),
            poll_timeout_seconds: 1.0,
        }
    }

    pub fn with_poll_timeout(mut self, seconds: f64) -> Self {
        self.poll_timeout_seconds = seconds;
        self
    }

    /// 消费循环，收到关闭信号后等待进行中的任务结束
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let requeued = self.queue.requeue_pending().await?;
        info!(concurrency = self.concurrency, requeued, "Activity consumer started");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        loop {
            if *shutdown.borrow() {
                break;
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .context("consumer semaphore closed")?;

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                next = self.queue.next(self.poll_timeout_seconds) => match next {
                    Ok(Some(payload)) => {
                        let consumer = Arc::clone(&self);
                        tokio::spawn(async move {
                            consumer.handle_payload(payload).await;
                            drop(permit);
                        });
                    }
                    Ok(None) => {}
                    Err(err) => {
                        error!(error = %err, "Failed to read activity queue");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                },
            }
        }

        // 等待所有进行中的任务归还许可
        let _drained = semaphore
            .acquire_many(self.concurrency as u32)
            .await
            .context("consumer semaphore closed")?;
        info!("Activity consumer stopped");
        Ok(())
    }

    /// 处理并确认一条消息
    pub async fn handle_payload(&self, payload: QueuedPayload) -> ProcessStatus {
        let status = self.process(&payload.payload).await;
        if let Err(err) = self.queue.ack(&payload).await {
            warn!(error = %err, "Failed to ack activity event");
        }
        status
    }

    async fn process(&self, raw: &str) -> ProcessStatus {
        let event: ActivityEvent = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(err) => {
                self.metrics
                    .events_failed_total
                    .with_label_values(&["malformed"])
                    .inc();
                warn!(error = %err, payload = %raw, "Dropping malformed activity event");
                return ProcessStatus::Malformed;
            }
        };

        let started = Instant::now();
        let kind = event.kind;
        let user_id = event.user_id.clone();
        match self
            .command_handler
            .handle_record_activity(RecordActivityCommand { event })
            .await
        {
            Ok(outcome) => {
                self.metrics
                    .events_processed_total
                    .with_label_values(&[kind.as_str()])
                    .inc();
                debug!(
                    user_id = %user_id,
                    kind = %kind,
                    ?outcome,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Activity event processed"
                );
                ProcessStatus::Processed
            }
            Err(err) => {
                self.metrics
                    .events_failed_total
                    .with_label_values(&[kind.as_str()])
                    .inc();
                error!(user_id = %user_id, kind = %kind, error = %err, "Failed to process activity event");
                ProcessStatus::Failed
            }
        }
    }
}
