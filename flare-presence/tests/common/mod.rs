#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use flare_presence::config::PresenceConfig;
use flare_presence::domain::model::Notification;
use flare_presence::domain::repository::{
    Clock, DailyStatisticRepository, Notifier, PresenceStore,
};
use flare_presence::infrastructure::clock::ManualClock;
use flare_presence::infrastructure::persistence::memory::{
    InMemoryActivityQueue, InMemoryDailyStatisticRepository, InMemoryPresenceStore,
    InMemoryUserProfileRepository, RecordingNotifier,
};
use flare_presence::service::wire::{self, Backends};
use flare_presence::service::ApplicationContext;
use flare_social_core::utils::day_key;
use tokio::sync::{Barrier, Notify};

pub fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, hour, minute, second).unwrap()
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub presence: Arc<InMemoryPresenceStore>,
    pub statistics: Arc<InMemoryDailyStatisticRepository>,
    pub profiles: Arc<InMemoryUserProfileRepository>,
    pub notifier: Arc<RecordingNotifier>,
    pub queue: Arc<InMemoryActivityQueue>,
    pub context: ApplicationContext,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(PresenceConfig::default())
    }

    pub fn with_config(config: PresenceConfig) -> Self {
        let clock = Arc::new(ManualClock::new(at(12, 0, 0)));
        let presence = Arc::new(InMemoryPresenceStore::new(clock.clone()));
        Self::build(config, clock, presence.clone(), presence)
    }

    /// 使用包装过的在线状态存储，其余依赖仍为内存实现
    pub fn with_presence_wrapper(
        wrap: impl FnOnce(Arc<InMemoryPresenceStore>) -> Arc<dyn PresenceStore>,
    ) -> Self {
        let clock = Arc::new(ManualClock::new(at(12, 0, 0)));
        let presence = Arc::new(InMemoryPresenceStore::new(clock.clone()));
        let wrapped = wrap(presence.clone());
        Self::build(PresenceConfig::default(), clock, presence, wrapped)
    }

    fn build(
        config: PresenceConfig,
        clock: Arc<ManualClock>,
        presence: Arc<InMemoryPresenceStore>,
        wired_presence: Arc<dyn PresenceStore>,
    ) -> Self {
        let statistics = Arc::new(InMemoryDailyStatisticRepository::new());
        let profiles = Arc::new(InMemoryUserProfileRepository::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let queue = Arc::new(InMemoryActivityQueue::new());

        let context = wire::assemble(
            config,
            Backends {
                presence: wired_presence,
                statistics: statistics.clone(),
                profiles: profiles.clone(),
                notifier: notifier.clone(),
                queue: queue.clone(),
                clock: clock.clone(),
            },
        );

        Self {
            clock,
            presence,
            statistics,
            profiles,
            notifier,
            queue,
            context,
        }
    }

    pub fn today(&self) -> String {
        day_key(self.clock.now(), self.context.config.timezone)
    }

    /// 今日已结算的秒数
    pub async fn spent_today(&self, user_id: &str) -> i64 {
        self.statistics
            .find(user_id, &self.today())
            .await
            .unwrap()
            .map(|record| record.spent_time_second)
            .unwrap_or(0)
    }

    /// 默认分桶中的当前会话累计
    pub async fn accrual(&self, user_id: &str) -> i64 {
        self.presence.get_score("online_users:5", user_id).await.unwrap()
    }

    pub async fn presence_marker(&self, user_id: &str) -> bool {
        self.presence
            .get_string(&format!("last_online:{user_id}"))
            .await
            .unwrap()
            .is_some()
    }

    pub fn advance(&self, seconds: i64) {
        self.clock.advance_secs(seconds);
    }
}

/// 读取在线标记后在屏障处等待，使两个并发事件都在写入前读到旧标记
pub struct BarrierPresenceStore {
    inner: Arc<InMemoryPresenceStore>,
    barrier: Barrier,
    armed: AtomicBool,
}

impl BarrierPresenceStore {
    pub fn new(inner: Arc<InMemoryPresenceStore>, parties: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(parties),
            armed: AtomicBool::new(false),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PresenceStore for BarrierPresenceStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let value = self.inner.get_string(key).await?;
        if key.starts_with("last_online:") && self.armed.load(Ordering::SeqCst) {
            self.barrier.wait().await;
        }
        Ok(value)
    }

    async fn set_string(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        self.inner.set_string(key, value, ttl_seconds).await
    }

    async fn get_score(&self, set: &str, member: &str) -> Result<i64> {
        self.inner.get_score(set, member).await
    }

    async fn set_score(&self, set: &str, member: &str, value: i64) -> Result<()> {
        self.inner.set_score(set, member, value).await
    }

    async fn incr_score(&self, set: &str, member: &str, delta: i64) -> Result<i64> {
        self.inner.incr_score(set, member, delta).await
    }

    async fn range_by_score(&self, set: &str, low: i64, high: Option<i64>) -> Result<Vec<String>> {
        self.inner.range_by_score(set, low, high).await
    }

    async fn remove_member(&self, set: &str, member: &str) -> Result<()> {
        self.inner.remove_member(set, member).await
    }
}

/// 所有操作都失败的存储，模拟网络故障
pub struct UnavailablePresenceStore;

#[async_trait]
impl PresenceStore for UnavailablePresenceStore {
    async fn get_string(&self, _key: &str) -> Result<Option<String>> {
        bail!("connection refused")
    }

    async fn set_string(&self, _key: &str, _value: &str, _ttl: Option<u64>) -> Result<()> {
        bail!("connection refused")
    }

    async fn get_score(&self, _set: &str, _member: &str) -> Result<i64> {
        bail!("connection refused")
    }

    async fn set_score(&self, _set: &str, _member: &str, _value: i64) -> Result<()> {
        bail!("connection refused")
    }

    async fn incr_score(&self, _set: &str, _member: &str, _delta: i64) -> Result<i64> {
        bail!("connection refused")
    }

    async fn range_by_score(&self, _set: &str, _low: i64, _high: Option<i64>) -> Result<Vec<String>> {
        bail!("connection refused")
    }

    async fn remove_member(&self, _set: &str, _member: &str) -> Result<()> {
        bail!("connection refused")
    }
}

/// 第一次通知时阻塞，直到测试放行
pub struct BlockingNotifier {
    pub entered: Notify,
    pub release: Notify,
    pub inner: RecordingNotifier,
}

impl BlockingNotifier {
    pub fn new() -> Self {
        Self {
            entered: Notify::new(),
            release: Notify::new(),
            inner: RecordingNotifier::new(),
        }
    }
}

#[async_trait]
impl Notifier for BlockingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.notify(notification).await
    }
}

/// 投递总是失败的通知服务
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _notification: &Notification) -> Result<()> {
        bail!("notification service unavailable")
    }
}
