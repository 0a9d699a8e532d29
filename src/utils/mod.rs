//! 工具函数模块
//!
//! 提供时间戳转换、日期键计算、时区解析等通用工具函数

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// 日期键格式（YYYYMMDD）
pub const DAY_KEY_FORMAT: &str = "%Y%m%d";

/// 获取当前时间戳（毫秒）
pub fn current_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 毫秒数转换为 DateTime
pub fn millis_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// 解析 IANA 时区名称，解析失败返回 None
pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}

/// 计算指定时刻在给定时区下的日期键（YYYYMMDD）
pub fn day_key(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format(DAY_KEY_FORMAT).to_string()
}

/// 解析日期键
pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, DAY_KEY_FORMAT).ok()
}
