//! 查询处理器（查询侧）- 直接读取仓储

use std::sync::Arc;

use anyhow::Result;
use tracing::instrument;

use crate::application::queries::{
    GetDailyStatisticQuery, GetLiveAccrualQuery, GetSpentSecondsQuery,
};
use crate::domain::model::{DailyStatistic, PresenceKeys};
use crate::domain::repository::{DailyStatisticRepository, PresenceStore};
use crate::domain::service::AlertRangeService;

/// 在线时长查询处理器
pub struct PresenceQueryHandler {
    statistics: Arc<dyn DailyStatisticRepository>,
    presence: Arc<dyn PresenceStore>,
    alert_range_service: Arc<AlertRangeService>,
    keys: PresenceKeys,
}

impl PresenceQueryHandler {
    pub fn new(
        statistics: Arc<dyn DailyStatisticRepository>,
        presence: Arc<dyn PresenceStore>,
        alert_range_service: Arc<AlertRangeService>,
        keys: PresenceKeys,
    ) -> Self {
        Self {
            statistics,
            presence,
            alert_range_service,
            keys,
        }
    }

    #[instrument(skip(self), fields(user_id = %query.user_id, day = %query.day))]
    pub async fn daily_statistic(
        &self,
        query: GetDailyStatisticQuery,
    ) -> Result<Option<DailyStatistic>> {
        self.statistics.find(&query.user_id, &query.day).await
    }

    /// 闭区间内已结算的在线秒数之和，不含进行中的会话
    #[instrument(skip(self), fields(user_id = %query.user_id))]
    pub async fn spent_seconds_between(&self, query: GetSpentSecondsQuery) -> Result<i64> {
        let records = self
            .statistics
            .find_range(&query.user_id, &query.from_day, &query.to_day)
            .await?;
        Ok(records.iter().map(|r| r.spent_time_second).sum())
    }

    #[instrument(skip(self), fields(user_id = %query.user_id))]
    pub async fn live_accrual(&self, query: GetLiveAccrualQuery) -> Result<i64> {
        let bucket = self.alert_range_service.resolve(&query.user_id).await?;
        self.presence
            .get_score(&self.keys.accrual_set(bucket), &query.user_id)
            .await
    }
}
