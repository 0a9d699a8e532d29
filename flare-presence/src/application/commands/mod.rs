//! 命令结构体定义（Command DTO）

use crate::domain::model::ActivityEvent;

/// 记录一条活跃事件
#[derive(Debug, Clone)]
pub struct RecordActivityCommand {
    pub event: ActivityEvent,
}

/// 修改用户提醒区间
#[derive(Debug, Clone)]
pub struct ChangeAlertRangeCommand {
    pub user_id: String,
    /// 新的提醒区间（分钟）
    pub alert_range: i64,
}
