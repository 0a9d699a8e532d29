//! 分档在线时长提醒扫描
//!
//! 每轮遍历全部分桶与档位，对累计落在 `[low, high)` 的用户各发一次提醒。
//! 扫描器不保存提醒历史，停留在同一档位的用户每轮都会收到提醒。
//! 这里不读取在线标记：已离线但累计未结算的用户在下一次事件前仍会命中档位。

use std::sync::Arc;

use anyhow::Result;
use flare_social_core::metrics::PresenceMetrics;
use tracing::{debug, info, warn};

use crate::domain::model::{AlertBand, Notification, NotificationTemplate, PresenceKeys};
use crate::domain::repository::{Notifier, PresenceStore};
use crate::domain::service::{AlertRangeService, ScanGuard, ScanReport};

/// 提醒扫描参数
#[derive(Debug, Clone, Copy)]
pub struct AlertScanPolicy {
    /// 分档基准（分钟）
    pub alert_minutes: i64,
    /// 档位数，档位从 1 开始
    pub levels: u32,
}

impl AlertScanPolicy {
    /// 由秒数阈值换算分档基准，四舍五入且不小于 1 分钟
    pub fn from_threshold_seconds(threshold_seconds: i64, levels: u32) -> Self {
        let alert_minutes = ((threshold_seconds as f64) / 60.0).round() as i64;
        Self {
            alert_minutes: alert_minutes.max(1),
            levels,
        }
    }

    pub fn bands(&self) -> Vec<AlertBand> {
        AlertBand::all(self.levels, self.alert_minutes)
    }
}

impl Default for AlertScanPolicy {
    fn default() -> Self {
        Self {
            alert_minutes: 5,
            levels: 3,
        }
    }
}

pub struct AlertBandScanner {
    presence: Arc<dyn PresenceStore>,
    alert_ranges: Arc<AlertRangeService>,
    notifier: Arc<dyn Notifier>,
    keys: PresenceKeys,
    policy: AlertScanPolicy,
    metrics: Arc<PresenceMetrics>,
    guard: ScanGuard,
}

impl AlertBandScanner {
    pub fn new(
        presence: Arc<dyn PresenceStore>,
        alert_ranges: Arc<AlertRangeService>,
        notifier: Arc<dyn Notifier>,
        keys: PresenceKeys,
        policy: AlertScanPolicy,
        metrics: Arc<PresenceMetrics>,
    ) -> Self {
        Self {
            presence,
            alert_ranges,
            notifier,
            keys,
            policy,
            metrics,
            guard: ScanGuard::new(),
        }
    }

    pub fn policy(&self) -> AlertScanPolicy {
        self.policy
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    /// 执行一轮扫描；上一轮未结束时直接跳过
    pub async fn run_once(&self) -> Result<ScanReport> {
        let Some(_token) = self.guard.try_acquire() else {
            self.metrics
                .scans_skipped_total
                .with_label_values(&["alert_band"])
                .inc();
            debug!("Alert band scan still running, skipping");
            return Ok(ScanReport::Skipped);
        };

        let buckets = self.alert_ranges.known_buckets().await?;
        let mut notified = 0;

        for band in self.policy.bands() {
            for bucket in &buckets {
                let set = self.keys.accrual_set(*bucket);
                let users = self
                    .presence
                    .range_by_score(&set, band.low_seconds, Some(band.high_seconds))
                    .await?;

                for user_id in users {
                    let notification = Notification::new(
                        user_id.as_str(),
                        NotificationTemplate::OnlineTimeAlert { level: band.level },
                    )
                    .with_param("alertMinutes", self.policy.alert_minutes)
                    .with_param("level", band.level)
                    .with_param("elapsedMinutes", band.elapsed_minutes());

                    match self.notifier.notify(&notification).await {
                        Ok(()) => {
                            notified += 1;
                            self.metrics
                                .alerts_sent_total
                                .with_label_values(&[&band.level.to_string()])
                                .inc();
                        }
                        Err(err) => {
                            warn!(user_id = %user_id, level = band.level, error = %err, "Failed to dispatch online time alert");
                        }
                    }
                }
            }
        }

        info!(notified, buckets = buckets.len(), "Alert band scan completed");
        Ok(ScanReport::Completed { notified })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_rounds_threshold() {
        assert_eq!(AlertScanPolicy::from_threshold_seconds(300, 3).alert_minutes, 5);
        assert_eq!(AlertScanPolicy::from_threshold_seconds(330, 3).alert_minutes, 6);
        assert_eq!(AlertScanPolicy::from_threshold_seconds(329, 3).alert_minutes, 5);
        assert_eq!(AlertScanPolicy::from_threshold_seconds(10, 3).alert_minutes, 1);
    }

    #[test]
    fn test_policy_bands() {
        let bands = AlertScanPolicy::default().bands();
        let ranges: Vec<_> = bands.iter().map(|b| (b.low_seconds, b.high_seconds)).collect();
        assert_eq!(ranges, vec![(300, 600), (600, 900), (900, 1200)]);
    }
}
