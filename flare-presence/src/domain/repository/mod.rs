//! 领域层依赖的存储与外部协作方接口

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::model::{ActivityEvent, DailyStatistic, Notification};

/// 在线状态存储（带 TTL 的键值 + 有序集合）
///
/// 有序集合分值统一为整数秒
#[async_trait]
pub trait PresenceStore: Send + Sync {
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// 写入字符串，`ttl_seconds` 为 None 时永不过期
    async fn set_string(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()>;

    /// 成员分值，不存在时返回 0
    async fn get_score(&self, set: &str, member: &str) -> Result<i64>;

    async fn set_score(&self, set: &str, member: &str, value: i64) -> Result<()>;

    /// 原子增加分值，返回增加后的分值
    async fn incr_score(&self, set: &str, member: &str, delta: i64) -> Result<i64>;

    /// 查询分值位于 `[low, high)` 的成员，`high` 为 None 表示无上界
    async fn range_by_score(&self, set: &str, low: i64, high: Option<i64>) -> Result<Vec<String>>;

    async fn remove_member(&self, set: &str, member: &str) -> Result<()>;
}

/// 每日在线统计存储
#[async_trait]
pub trait DailyStatisticRepository: Send + Sync {
    /// 原子累加当日在线秒数，不存在则插入
    async fn increment_or_insert(&self, user_id: &str, day: &str, delta_seconds: i64)
    -> Result<()>;

    async fn find(&self, user_id: &str, day: &str) -> Result<Option<DailyStatistic>>;

    /// 查询 `[from_day, to_day]` 闭区间内的统计，按日期升序
    async fn find_range(
        &self,
        user_id: &str,
        from_day: &str,
        to_day: &str,
    ) -> Result<Vec<DailyStatistic>>;
}

/// 用户资料读取
#[async_trait]
pub trait UserProfileRepository: Send + Sync {
    /// 用户设置的提醒区间（分钟），资料或字段缺失时返回 None
    async fn alert_range(&self, user_id: &str) -> Result<Option<i64>>;
}

/// 通知服务（发出即不管）
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// 队列中取出的一条待处理消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedPayload {
    pub payload: String,
}

/// 活跃事件队列（至少一次投递）
#[async_trait]
pub trait ActivityQueue: Send + Sync {
    async fn enqueue(&self, event: &ActivityEvent) -> Result<()>;

    /// 等待下一条消息，超时返回 None；取出的消息在 ack 前保留在处理中列表
    async fn next(&self, timeout_seconds: f64) -> Result<Option<QueuedPayload>>;

    async fn ack(&self, payload: &QueuedPayload) -> Result<()>;

    /// 将上次未确认的消息重新放回队列，返回数量
    async fn requeue_pending(&self) -> Result<usize>;
}

/// 时钟
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
