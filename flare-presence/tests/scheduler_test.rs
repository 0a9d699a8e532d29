mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use common::{Harness, at};
use flare_presence::domain::repository::PresenceStore;
use flare_presence::domain::service::ScanReport;
use flare_presence::interface::scheduler::{
    ALERT_BAND_JOB, JobScheduler, SLEEP_REMINDER_JOB, Schedule, ScheduledJob, TickOutcome,
};
use tokio::sync::watch;

struct CountingJob {
    runs: AtomicUsize,
}

#[async_trait]
impl ScheduledJob for CountingJob {
    fn name(&self) -> &str {
        "counting"
    }

    async fn run(&self) -> Result<ScanReport> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(ScanReport::Completed { notified: 0 })
    }
}

fn interval() -> Schedule {
    Schedule::Interval {
        every: Duration::from_secs(300),
    }
}

#[tokio::test]
async fn test_switched_off_job_is_not_dispatched() {
    let h = Harness::new();
    h.presence.set_score("online_users:5", "u1", 320).await.unwrap();
    let job: Arc<dyn ScheduledJob> = h.context.alert_scanner.clone();

    h.context.job_switch.set_active(ALERT_BAND_JOB, false).await.unwrap();
    let outcome = h.context.scheduler.tick(&job, &interval()).await.unwrap();
    assert!(matches!(outcome, TickOutcome::Disabled));
    assert!(h.notifier.sent().await.is_empty());

    h.context.job_switch.set_active(ALERT_BAND_JOB, true).await.unwrap();
    match h.context.scheduler.tick(&job, &interval()).await.unwrap() {
        TickOutcome::Spawned(handle) => handle.await.unwrap(),
        other => panic!("expected job to be dispatched, got {other:?}"),
    }
    assert_eq!(h.notifier.sent().await.len(), 1);
}

#[tokio::test]
async fn test_switch_values() {
    let h = Harness::new();
    let switch = &h.context.job_switch;

    assert!(switch.is_active(SLEEP_REMINDER_JOB).await.unwrap());
    for (raw, active) in [("0", false), ("off", false), ("FALSE", false), ("1", true), ("yes", true)] {
        h.presence
            .set_string("job_active:sleep_reminder_scan", raw, None)
            .await
            .unwrap();
        assert_eq!(switch.is_active(SLEEP_REMINDER_JOB).await.unwrap(), active, "value {raw}");
    }
}

#[tokio::test]
async fn test_sleep_job_runs_only_inside_night_window() {
    let h = Harness::new();
    let job: Arc<dyn ScheduledJob> = h.context.sleep_scanner.clone();
    let night = Schedule::Window {
        start_hour: 23,
        end_hour: 6,
        every: Duration::from_secs(3600),
    };

    h.clock.set(at(12, 0, 0));
    let outcome = h.context.scheduler.tick(&job, &night).await.unwrap();
    assert!(matches!(outcome, TickOutcome::OutsideWindow));

    h.clock.set(at(23, 30, 0));
    let outcome = h.context.scheduler.tick(&job, &night).await.unwrap();
    assert!(outcome.is_spawned());
}

#[tokio::test]
async fn test_registered_jobs() {
    let h = Harness::new();
    assert_eq!(
        h.context.scheduler.job_names(),
        vec![ALERT_BAND_JOB.to_string(), SLEEP_REMINDER_JOB.to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_timer_loop_fires_and_stops() {
    let h = Harness::new();
    let job = Arc::new(CountingJob {
        runs: AtomicUsize::new(0),
    });
    let mut scheduler = JobScheduler::new(
        h.context.job_switch.clone(),
        h.clock.clone(),
        chrono_tz::UTC,
    );
    scheduler.register(job.clone(), interval());
    let scheduler = Arc::new(scheduler);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = scheduler.start(shutdown_rx);

    // 首次触发在一个间隔之后
    tokio::time::sleep(Duration::from_secs(299)).await;
    assert_eq!(job.runs.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(job.runs.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(job.runs.load(Ordering::SeqCst), 2);

    shutdown_tx.send(true).unwrap();
    for handle in handles {
        handle.await.unwrap();
    }
}
