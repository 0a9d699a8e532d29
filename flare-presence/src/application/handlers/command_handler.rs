//! 命令处理器（编排层）- 轻量级，只负责编排领域服务

use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::instrument;

use crate::application::commands::{ChangeAlertRangeCommand, RecordActivityCommand};
use crate::domain::model::ActivityKind;
use crate::domain::service::{AccrualOutcome, AlertRangeService, SessionAccrualService};

/// 在线时长命令处理器（编排层）
pub struct PresenceCommandHandler {
    accrual_service: Arc<SessionAccrualService>,
    alert_range_service: Arc<AlertRangeService>,
}

impl PresenceCommandHandler {
    pub fn new(
        accrual_service: Arc<SessionAccrualService>,
        alert_range_service: Arc<AlertRangeService>,
    ) -> Self {
        Self {
            accrual_service,
            alert_range_service,
        }
    }

    /// 处理活跃事件命令
    #[instrument(skip(self), fields(user_id = %command.event.user_id, kind = %command.event.kind))]
    pub async fn handle_record_activity(
        &self,
        command: RecordActivityCommand,
    ) -> Result<AccrualOutcome> {
        let event = command.event;
        if event.user_id.trim().is_empty() {
            bail!("activity event without user id");
        }

        match event.kind {
            ActivityKind::Heartbeat => self.accrual_service.on_heartbeat(&event.user_id).await,
            ActivityKind::Activity => self.accrual_service.on_activity(&event.user_id).await,
        }
    }

    /// 处理修改提醒区间命令
    #[instrument(skip(self), fields(user_id = %command.user_id, alert_range = command.alert_range))]
    pub async fn handle_change_alert_range(&self, command: ChangeAlertRangeCommand) -> Result<()> {
        self.alert_range_service
            .change_range(&command.user_id, command.alert_range)
            .await
    }
}
