use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

/// 任务触发计划
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// 固定间隔触发
    Interval { every: Duration },
    /// 仅在 `[start_hour, end_hour)` 时段内按固定间隔触发；跨午夜时 start > end，
    /// start == end 表示全天
    Window {
        start_hour: u32,
        end_hour: u32,
        every: Duration,
    },
}

impl Schedule {
    pub fn every(&self) -> Duration {
        match self {
            Schedule::Interval { every } | Schedule::Window { every, .. } => *every,
        }
    }

    /// 判断 `at`（按 `tz` 换算本地小时）是否允许执行
    pub fn allows(&self, at: DateTime<Utc>, tz: Tz) -> bool {
        match self {
            Schedule::Interval { .. } => true,
            Schedule::Window {
                start_hour,
                end_hour,
                ..
            } => hour_in_window(at.with_timezone(&tz).hour(), *start_hour, *end_hour),
        }
    }
}

pub fn hour_in_window(hour: u32, start_hour: u32, end_hour: u32) -> bool {
    if start_hour == end_hour {
        true
    } else if start_hour < end_hour {
        hour >= start_hour && hour < end_hour
    } else {
        hour >= start_hour || hour < end_hour
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_window_wraps_midnight() {
        assert!(hour_in_window(23, 23, 6));
        assert!(hour_in_window(0, 23, 6));
        assert!(hour_in_window(5, 23, 6));
        assert!(!hour_in_window(6, 23, 6));
        assert!(!hour_in_window(12, 23, 6));
    }

    #[test]
    fn test_window_same_day_and_full_day() {
        assert!(hour_in_window(9, 9, 17));
        assert!(!hour_in_window(17, 9, 17));
        assert!(hour_in_window(3, 4, 4));
    }

    #[test]
    fn test_window_uses_timezone() {
        let schedule = Schedule::Window {
            start_hour: 23,
            end_hour: 6,
            every: Duration::from_secs(3600),
        };
        // 15:30 UTC 即上海 23:30
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 15, 30, 0).unwrap();
        assert!(!schedule.allows(at, chrono_tz::UTC));
        assert!(schedule.allows(at, chrono_tz::Asia::Shanghai));
        assert_eq!(schedule.every(), Duration::from_secs(3600));
    }
}
