use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::model::DailyStatistic;
use crate::domain::repository::{DailyStatisticRepository, UserProfileRepository};

/// 内存版每日统计，按 (userId, createdDate) 唯一
#[derive(Default)]
pub struct InMemoryDailyStatisticRepository {
    inner: Arc<RwLock<BTreeMap<(String, String), DailyStatistic>>>,
}

impl InMemoryDailyStatisticRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<DailyStatistic> {
        let guard = self.inner.read().await;
        guard.values().cloned().collect()
    }
}

#[async_trait]
impl DailyStatisticRepository for InMemoryDailyStatisticRepository {
    async fn increment_or_insert(
        &self,
        user_id: &str,
        day: &str,
        delta_seconds: i64,
    ) -> Result<()> {
        let mut guard = self.inner.write().await;
        let record = guard
            .entry((user_id.to_string(), day.to_string()))
            .or_insert_with(|| DailyStatistic {
                user_id: user_id.to_string(),
                created_date: day.to_string(),
                spent_time_second: 0,
                point: 0,
            });
        record.spent_time_second += delta_seconds;
        Ok(())
    }

    async fn find(&self, user_id: &str, day: &str) -> Result<Option<DailyStatistic>> {
        let guard = self.inner.read().await;
        Ok(guard
            .get(&(user_id.to_string(), day.to_string()))
            .cloned())
    }

    async fn find_range(
        &self,
        user_id: &str,
        from_day: &str,
        to_day: &str,
    ) -> Result<Vec<DailyStatistic>> {
        let guard = self.inner.read().await;
        let from = (user_id.to_string(), from_day.to_string());
        let to = (user_id.to_string(), to_day.to_string());
        if from > to {
            return Ok(Vec::new());
        }
        Ok(guard.range(from..=to).map(|(_, record)| record.clone()).collect())
    }
}

/// 内存版用户资料
#[derive(Default)]
pub struct InMemoryUserProfileRepository {
    ranges: Arc<RwLock<BTreeMap<String, i64>>>,
}

impl InMemoryUserProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_alert_range(&self, user_id: &str, range: i64) {
        let mut guard = self.ranges.write().await;
        guard.insert(user_id.to_string(), range);
    }
}

#[async_trait]
impl UserProfileRepository for InMemoryUserProfileRepository {
    async fn alert_range(&self, user_id: &str) -> Result<Option<i64>> {
        let guard = self.ranges.read().await;
        Ok(guard.get(user_id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_increment_or_insert_accumulates() {
        let repo = InMemoryDailyStatisticRepository::new();
        repo.increment_or_insert("u1", "20261018", 30).await.unwrap();
        repo.increment_or_insert("u1", "20261018", 45).await.unwrap();
        repo.increment_or_insert("u1", "20261019", 10).await.unwrap();
        repo.increment_or_insert("u2", "20261018", 99).await.unwrap();

        let record = repo.find("u1", "20261018").await.unwrap().unwrap();
        assert_eq!(record.spent_time_second, 75);

        let range = repo.find_range("u1", "20261001", "20261031").await.unwrap();
        let days: Vec<_> = range.iter().map(|r| r.created_date.as_str()).collect();
        assert_eq!(days, vec!["20261018", "20261019"]);
        assert!(repo.find_range("u1", "20261031", "20261001").await.unwrap().is_empty());
    }
}
