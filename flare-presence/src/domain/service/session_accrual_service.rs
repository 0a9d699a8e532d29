//! 会话在线时长累计领域服务
//!
//! 没有显式的下线事件：在线标记 `last_online:{userId}` 过期即视为会话结束。
//! 每条 activity 事件刷新标记，并把与上一次事件之间的真实间隔累加到会话累计；
//! 间隔达到阈值或标记缺失时，上一会话的累计写入当日统计并清零。
//!
//! 同一用户的并发事件之间没有加锁（读标记与写累计不是原子的），
//! 并发或重复投递可能导致少计或重复计入一次间隔。

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use flare_social_core::metrics::PresenceMetrics;
use flare_social_core::utils::{day_key, millis_to_datetime};
use tracing::{debug, info, warn};

use crate::domain::model::PresenceKeys;
use crate::domain::repository::{Clock, DailyStatisticRepository, PresenceStore};
use crate::domain::service::AlertRangeService;

/// 会话判定参数
#[derive(Debug, Clone)]
pub struct AccrualPolicy {
    /// 在线标记过期时间（秒）
    pub marker_ttl_seconds: u64,
    /// 两次 activity 间隔达到该值即视为新会话（秒）
    pub session_gap_seconds: i64,
    /// 计算日期键使用的时区
    pub timezone: Tz,
}

impl Default for AccrualPolicy {
    fn default() -> Self {
        Self {
            marker_ttl_seconds: 60,
            session_gap_seconds: 60,
            timezone: chrono_tz::UTC,
        }
    }
}

/// 单条事件的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccrualOutcome {
    /// 标记缺失，新会话开始；`flushed_seconds` 为上一会话结算的秒数
    SessionStarted { flushed_seconds: i64 },
    /// 标记仍在但间隔达到阈值，结算后开始新会话
    SessionRestarted {
        gap_seconds: i64,
        flushed_seconds: i64,
    },
    /// 会话持续，累计增加 `gap_seconds`
    Accrued { gap_seconds: i64 },
    /// 心跳观察到会话已过期并完成结算
    Expired { flushed_seconds: i64 },
    /// 无变化
    Unchanged,
}

pub struct SessionAccrualService {
    presence: Arc<dyn PresenceStore>,
    statistics: Arc<dyn DailyStatisticRepository>,
    alert_ranges: Arc<AlertRangeService>,
    clock: Arc<dyn Clock>,
    keys: PresenceKeys,
    policy: AccrualPolicy,
    metrics: Arc<PresenceMetrics>,
}

impl SessionAccrualService {
    pub fn new(
        presence: Arc<dyn PresenceStore>,
        statistics: Arc<dyn DailyStatisticRepository>,
        alert_ranges: Arc<AlertRangeService>,
        clock: Arc<dyn Clock>,
        keys: PresenceKeys,
        policy: AccrualPolicy,
        metrics: Arc<PresenceMetrics>,
    ) -> Self {
        Self {
            presence,
            statistics,
            alert_ranges,
            clock,
            keys,
            policy,
            metrics,
        }
    }

    /// 处理轻量轮询接口的心跳
    ///
    /// 不刷新标记、不累计时长，只观察会话是否已经过期：
    /// 标记缺失且累计大于 0 时结算并清零
    pub async fn on_heartbeat(&self, user_id: &str) -> Result<AccrualOutcome> {
        let bucket = self.alert_ranges.resolve(user_id).await?;
        let set = self.keys.accrual_set(bucket);

        let marker = self
            .presence
            .get_string(&self.keys.session_marker(user_id))
            .await?;
        if marker.is_some() {
            return Ok(AccrualOutcome::Unchanged);
        }

        let accrued = self.presence.get_score(&set, user_id).await?;
        if accrued <= 0 {
            return Ok(AccrualOutcome::Unchanged);
        }

        let now = self.clock.now();
        self.close_session(user_id, &set, accrued, now).await?;
        info!(user_id = %user_id, flushed_seconds = accrued, "Session expired, observed by heartbeat");
        Ok(AccrualOutcome::Expired {
            flushed_seconds: accrued,
        })
    }

    /// 处理普通请求产生的活跃事件
    pub async fn on_activity(&self, user_id: &str) -> Result<AccrualOutcome> {
        let now = self.clock.now();

        // 1. 解析分桶
        let bucket = self.alert_ranges.resolve(user_id).await?;
        let set = self.keys.accrual_set(bucket);

        // 2. 读取当前累计
        let accrued = self.presence.get_score(&set, user_id).await?;

        // 3. 覆盖前读取标记
        let marker_key = self.keys.session_marker(user_id);
        let marker = self.presence.get_string(&marker_key).await?;

        // 4. 无条件刷新标记
        self.presence
            .set_string(
                &marker_key,
                &now.timestamp_millis().to_string(),
                Some(self.policy.marker_ttl_seconds),
            )
            .await?;

        let last_seen = match marker.as_deref() {
            None => None,
            Some(raw) => {
                let parsed = parse_marker(raw);
                if parsed.is_none() {
                    warn!(user_id = %user_id, marker = %raw, "Unreadable session marker, starting new session");
                }
                parsed
            }
        };

        // 5. 标记缺失：新会话
        let Some(last_seen) = last_seen else {
            let flushed = self.close_session(user_id, &set, accrued, now).await?;
            debug!(user_id = %user_id, bucket, flushed_seconds = flushed, "Session started");
            return Ok(AccrualOutcome::SessionStarted {
                flushed_seconds: flushed,
            });
        };

        // 6. 标记存在：按真实间隔累计
        let gap = (now - last_seen).num_seconds();
        if gap >= self.policy.session_gap_seconds {
            let flushed = self.close_session(user_id, &set, accrued, now).await?;
            info!(user_id = %user_id, gap_seconds = gap, flushed_seconds = flushed, "Session gap reached, session restarted");
            return Ok(AccrualOutcome::SessionRestarted {
                gap_seconds: gap,
                flushed_seconds: flushed,
            });
        }

        // 乱序事件的负间隔不回退累计
        let gap = gap.max(0);
        if gap > 0 {
            self.presence.incr_score(&set, user_id, gap).await?;
        }
        Ok(AccrualOutcome::Accrued { gap_seconds: gap })
    }

    /// 清零会话累计，并把大于 0 的累计结算到当天
    async fn close_session(
        &self,
        user_id: &str,
        set: &str,
        accrued: i64,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        self.presence.set_score(set, user_id, 0).await?;
        if accrued <= 0 {
            return Ok(0);
        }

        self.flush(user_id, accrued, &day_key(now, self.policy.timezone))
            .await?;
        Ok(accrued)
    }

    /// 结算写入（非幂等，重复执行会重复累加）
    pub async fn flush(&self, user_id: &str, seconds: i64, day: &str) -> Result<()> {
        self.statistics
            .increment_or_insert(user_id, day, seconds)
            .await?;
        self.metrics.sessions_flushed_total.inc();
        self.metrics.flushed_seconds_total.inc_by(seconds.max(0) as u64);
        debug!(user_id = %user_id, day = %day, seconds, "Session flushed to daily statistic");
        Ok(())
    }
}

fn parse_marker(raw: &str) -> Option<DateTime<Utc>> {
    raw.trim().parse::<i64>().ok().and_then(millis_to_datetime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_marker() {
        let at = parse_marker("1760745600000").unwrap();
        assert_eq!(at.timestamp(), 1_760_745_600);
        assert!(parse_marker("2026-10-18T00:00:00Z").is_none());
        assert!(parse_marker("").is_none());
    }
}
