//! # Prometheus 指标收集模块
//!
//! 为各个服务模块提供统一的 Prometheus 指标收集能力。

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

/// 全局指标注册表
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// 在线时长统计服务指标
pub struct PresenceMetrics {
    /// 活跃事件处理总数（按事件类型）
    pub events_processed_total: IntCounterVec,
    /// 活跃事件处理失败总数（按事件类型）
    pub events_failed_total: IntCounterVec,
    /// 会话结算次数
    pub sessions_flushed_total: IntCounter,
    /// 结算写入的在线秒数
    pub flushed_seconds_total: IntCounter,
    /// 在线时长提醒发送次数（按档位）
    pub alerts_sent_total: IntCounterVec,
    /// 睡眠提醒发送次数
    pub sleep_reminders_total: IntCounter,
    /// 因上一轮未结束而跳过的扫描次数（按任务）
    pub scans_skipped_total: IntCounterVec,
}

impl PresenceMetrics {
    pub fn new() -> Self {
        let events_processed_total = IntCounterVec::new(
            Opts::new(
                "presence_events_processed_total",
                "Total number of activity events processed",
            ),
            &["kind"],
        )
        .expect("Failed to create presence_events_processed_total metric");

        let events_failed_total = IntCounterVec::new(
            Opts::new(
                "presence_events_failed_total",
                "Total number of activity events that failed",
            ),
            &["kind"],
        )
        .expect("Failed to create presence_events_failed_total metric");

        let sessions_flushed_total = IntCounter::new(
            "presence_sessions_flushed_total",
            "Total number of closed sessions flushed to daily statistics",
        )
        .expect("Failed to create presence_sessions_flushed_total metric");

        let flushed_seconds_total = IntCounter::new(
            "presence_flushed_seconds_total",
            "Total online seconds flushed to daily statistics",
        )
        .expect("Failed to create presence_flushed_seconds_total metric");

        let alerts_sent_total = IntCounterVec::new(
            Opts::new(
                "presence_alerts_sent_total",
                "Total number of online time alerts dispatched",
            ),
            &["level"],
        )
        .expect("Failed to create presence_alerts_sent_total metric");

        let sleep_reminders_total = IntCounter::new(
            "presence_sleep_reminders_total",
            "Total number of sleep reminders dispatched",
        )
        .expect("Failed to create presence_sleep_reminders_total metric");

        let scans_skipped_total = IntCounterVec::new(
            Opts::new(
                "presence_scans_skipped_total",
                "Total number of scans skipped because the previous run was still active",
            ),
            &["job"],
        )
        .expect("Failed to create presence_scans_skipped_total metric");

        // 注册指标，忽略重复注册错误（测试中可能会重复创建）
        let _ = REGISTRY.register(Box::new(events_processed_total.clone()));
        let _ = REGISTRY.register(Box::new(events_failed_total.clone()));
        let _ = REGISTRY.register(Box::new(sessions_flushed_total.clone()));
        let _ = REGISTRY.register(Box::new(flushed_seconds_total.clone()));
        let _ = REGISTRY.register(Box::new(alerts_sent_total.clone()));
        let _ = REGISTRY.register(Box::new(sleep_reminders_total.clone()));
        let _ = REGISTRY.register(Box::new(scans_skipped_total.clone()));

        Self {
            events_processed_total,
            events_failed_total,
            sessions_flushed_total,
            flushed_seconds_total,
            alerts_sent_total,
            sleep_reminders_total,
            scans_skipped_total,
        }
    }
}

impl Default for PresenceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// 获取 Prometheus 指标导出格式
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %err, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_contains_registered_metrics() {
        let metrics = PresenceMetrics::new();
        metrics.sessions_flushed_total.inc();
        metrics
            .alerts_sent_total
            .with_label_values(&["1"])
            .inc();

        let output = gather_metrics();
        assert!(output.contains("presence_sessions_flushed_total"));
        assert!(output.contains("presence_alerts_sent_total"));
    }
}
