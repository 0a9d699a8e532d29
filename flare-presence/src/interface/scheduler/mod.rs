mod job_scheduler;
mod schedule;

pub use job_scheduler::{
    ALERT_BAND_JOB, JobScheduler, SLEEP_REMINDER_JOB, ScheduledJob, TickOutcome,
};
pub use schedule::{Schedule, hour_in_window};
