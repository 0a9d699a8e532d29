//! 查询结构体定义（Query DTO）

/// 查询某天的在线统计
#[derive(Debug, Clone)]
pub struct GetDailyStatisticQuery {
    pub user_id: String,
    /// 日期键（YYYYMMDD）
    pub day: String,
}

/// 查询日期闭区间内的累计在线秒数
#[derive(Debug, Clone)]
pub struct GetSpentSecondsQuery {
    pub user_id: String,
    pub from_day: String,
    pub to_day: String,
}

/// 查询当前会话已累计的秒数（尚未结算）
#[derive(Debug, Clone)]
pub struct GetLiveAccrualQuery {
    pub user_id: String,
}
