//! 深夜睡眠提醒扫描
//!
//! 找出当前会话累计大于 0 的用户；在线标记已过期的用户视为已离开，不再提醒。
//! 只读在线标记，不刷新。

use std::sync::Arc;

use anyhow::Result;
use flare_social_core::metrics::PresenceMetrics;
use tracing::{debug, info, warn};

use crate::domain::model::{Notification, NotificationTemplate, PresenceKeys};
use crate::domain::repository::{Notifier, PresenceStore};
use crate::domain::service::{AlertRangeService, ScanGuard, ScanReport};

pub struct SleepReminderScanner {
    presence: Arc<dyn PresenceStore>,
    alert_ranges: Arc<AlertRangeService>,
    notifier: Arc<dyn Notifier>,
    keys: PresenceKeys,
    metrics: Arc<PresenceMetrics>,
    guard: ScanGuard,
}

impl SleepReminderScanner {
    pub fn new(
        presence: Arc<dyn PresenceStore>,
        alert_ranges: Arc<AlertRangeService>,
        notifier: Arc<dyn Notifier>,
        keys: PresenceKeys,
        metrics: Arc<PresenceMetrics>,
    ) -> Self {
        Self {
            presence,
            alert_ranges,
            notifier,
            keys,
            metrics,
            guard: ScanGuard::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    pub async fn run_once(&self) -> Result<ScanReport> {
        let Some(_token) = self.guard.try_acquire() else {
            self.metrics
                .scans_skipped_total
                .with_label_values(&["sleep_reminder"])
                .inc();
            debug!("Sleep reminder scan still running, skipping");
            return Ok(ScanReport::Skipped);
        };

        let mut notified = 0;
        for bucket in self.alert_ranges.known_buckets().await? {
            let set = self.keys.accrual_set(bucket);
            let users = self.presence.range_by_score(&set, 1, None).await?;

            for user_id in users {
                let marker = self
                    .presence
                    .get_string(&self.keys.session_marker(&user_id))
                    .await?;
                if marker.is_none() {
                    debug!(user_id = %user_id, "Session marker expired, skipping sleep reminder");
                    continue;
                }

                let accrued = self.presence.get_score(&set, &user_id).await?;
                let notification =
                    Notification::new(user_id.as_str(), NotificationTemplate::SleepReminder)
                        .with_param("onlineMinutes", accrued / 60);

                match self.notifier.notify(&notification).await {
                    Ok(()) => {
                        notified += 1;
                        self.metrics.sleep_reminders_total.inc();
                    }
                    Err(err) => {
                        warn!(user_id = %user_id, error = %err, "Failed to dispatch sleep reminder");
                    }
                }
            }
        }

        info!(notified, "Sleep reminder scan completed");
        Ok(ScanReport::Completed { notified })
    }
}
