use serde::{Deserialize, Serialize};

/// 每日在线统计（按用户 + 日期唯一）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStatistic {
    pub user_id: String,
    /// 日期键（YYYYMMDD）
    pub created_date: String,
    /// 当日累计在线秒数，只增不减
    pub spent_time_second: i64,
    #[serde(default)]
    pub point: i64,
}
