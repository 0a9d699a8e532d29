//! 定时任务调度
//!
//! 每个任务独立一个计时循环。每次触发时先检查时段，再读取持久化开关，
//! 满足条件后把任务派发到独立的 tokio 任务中执行，计时循环不等待其完成；
//! 重入由任务自身的防重入标记处理。

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono_tz::Tz;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use super::Schedule;
use crate::domain::repository::Clock;
use crate::domain::service::{
    AlertBandScanner, JobSwitch, ScanReport, SleepReminderScanner,
};

pub const ALERT_BAND_JOB: &str = "alert_band_scan";
pub const SLEEP_REMINDER_JOB: &str = "sleep_reminder_scan";

#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self) -> Result<ScanReport>;
}

#[async_trait]
impl ScheduledJob for AlertBandScanner {
    fn name(&self) -> &str {
        ALERT_BAND_JOB
    }

    async fn run(&self) -> Result<ScanReport> {
        self.run_once().await
    }
}

#[async_trait]
impl ScheduledJob for SleepReminderScanner {
    fn name(&self) -> &str {
        SLEEP_REMINDER_JOB
    }

    async fn run(&self) -> Result<ScanReport> {
        self.run_once().await
    }
}

/// 单次触发的结果
#[derive(Debug)]
pub enum TickOutcome {
    /// 已派发，句柄用于等待执行结束
    Spawned(JoinHandle<()>),
    /// 持久化开关关闭
    Disabled,
    /// 不在允许的时段内
    OutsideWindow,
}

impl TickOutcome {
    pub fn is_spawned(&self) -> bool {
        matches!(self, TickOutcome::Spawned(_))
    }
}

struct Entry {
    job: Arc<dyn ScheduledJob>,
    schedule: Schedule,
}

pub struct JobScheduler {
    switch: Arc<JobSwitch>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
    entries: Vec<Entry>,
}

impl JobScheduler {
    pub fn new(switch: Arc<JobSwitch>, clock: Arc<dyn Clock>, timezone: Tz) -> Self {
        Self {
            switch,
            clock,
            timezone,
            entries: Vec::new(),
        }
    }

    pub fn register(&mut self, job: Arc<dyn ScheduledJob>, schedule: Schedule) {
        info!(job = %job.name(), ?schedule, "Scheduled job registered");
        self.entries.push(Entry { job, schedule });
    }

    pub fn job_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.job.name().to_string())
            .collect()
    }

    /// 执行一次触发判定
    pub async fn tick(&self, job: &Arc<dyn ScheduledJob>, schedule: &Schedule) -> Result<TickOutcome> {
        if !schedule.allows(self.clock.now(), self.timezone) {
            debug!(job = %job.name(), "Outside schedule window, skipping");
            return Ok(TickOutcome::OutsideWindow);
        }

        if !self.switch.is_active(job.name()).await? {
            debug!(job = %job.name(), "Job switched off, skipping");
            return Ok(TickOutcome::Disabled);
        }

        let job = Arc::clone(job);
        let handle = tokio::spawn(async move {
            match job.run().await {
                Ok(report) => debug!(job = %job.name(), ?report, "Scheduled job finished"),
                Err(err) => error!(job = %job.name(), error = %err, "Scheduled job failed"),
            }
        });
        Ok(TickOutcome::Spawned(handle))
    }

    /// 启动全部计时循环，收到关闭信号后退出
    pub fn start(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        (0..self.entries.len())
            .map(|index| {
                let scheduler = Arc::clone(&self);
                let mut shutdown = shutdown.clone();
                tokio::spawn(async move {
                    let entry = &scheduler.entries[index];
                    let every = entry.schedule.every();
                    let mut ticker = interval_at(Instant::now() + every, every);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

                    loop {
                        if *shutdown.borrow() {
                            break;
                        }
                        tokio::select! {
                            changed = shutdown.changed() => {
                                if changed.is_err() {
                                    break;
                                }
                            }
                            _ = ticker.tick() => {
                                if let Err(err) = scheduler.tick(&entry.job, &entry.schedule).await {
                                    warn!(job = %entry.job.name(), error = %err, "Failed to evaluate scheduled job");
                                }
                            }
                        }
                    }
                    info!(job = %entry.job.name(), "Scheduled job loop stopped");
                })
            })
            .collect()
    }
}
