use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::repository::Clock;

/// 系统时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 可手动推进的时钟，用于本地调试与测试
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(at) }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = at;
        }
    }

    pub fn advance_secs(&self, seconds: i64) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += Duration::seconds(seconds);
        }
    }
}

impl Default for ManualClock {
    /// 2026-10-18 12:00:00 UTC
    fn default() -> Self {
        let at = Utc
            .with_ymd_and_hms(2026, 10, 18, 12, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self::new(at)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::default();
        let start = clock.now();
        clock.advance_secs(90);
        assert_eq!((clock.now() - start).num_seconds(), 90);
    }
}
