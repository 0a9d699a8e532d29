//! 用户提醒区间（分桶）解析与维护
//!
//! 每个用户的会话累计只存在于其提醒区间对应的 `online_users:{bucket}` 集合中，
//! 所有用到的区间登记在区间索引里，供扫描器遍历。

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{debug, info, warn};

use crate::domain::model::PresenceKeys;
use crate::domain::repository::{PresenceStore, UserProfileRepository};

pub struct AlertRangeService {
    presence: Arc<dyn PresenceStore>,
    profiles: Arc<dyn UserProfileRepository>,
    keys: PresenceKeys,
    default_range: i64,
}

impl AlertRangeService {
    pub fn new(
        presence: Arc<dyn PresenceStore>,
        profiles: Arc<dyn UserProfileRepository>,
        keys: PresenceKeys,
        default_range: i64,
    ) -> Self {
        Self {
            presence,
            profiles,
            keys,
            default_range,
        }
    }

    pub fn default_range(&self) -> i64 {
        self.default_range
    }

    /// 解析用户的提醒区间
    ///
    /// 先读缓存；未命中时读取用户资料（缺失则使用默认值）并写入无过期缓存
    pub async fn resolve(&self, user_id: &str) -> Result<i64> {
        let cache_key = self.keys.alert_range(user_id);
        if let Some(cached) = self.presence.get_string(&cache_key).await? {
            match cached.trim().parse::<i64>() {
                Ok(range) if range > 0 => return Ok(range),
                _ => warn!(user_id = %user_id, value = %cached, "Invalid cached alert range, reloading"),
            }
        }

        let range = match self.profiles.alert_range(user_id).await {
            Ok(Some(range)) if range > 0 => range,
            Ok(_) => self.default_range,
            Err(err) => {
                // 资料读取失败不缓存，下次事件再尝试
                warn!(user_id = %user_id, error = %err, "Failed to load user profile, using default alert range");
                return Ok(self.default_range);
            }
        };

        self.presence
            .set_string(&cache_key, &range.to_string(), None)
            .await?;
        self.register_bucket(range).await?;
        debug!(user_id = %user_id, range, "Alert range cached");
        Ok(range)
    }

    /// 修改用户的提醒区间，并把进行中的会话累计迁移到新分桶
    pub async fn change_range(&self, user_id: &str, range: i64) -> Result<()> {
        if range <= 0 {
            bail!("alert range must be positive, got {range}");
        }

        let previous = self.resolve(user_id).await?;
        if previous != range {
            let old_set = self.keys.accrual_set(previous);
            let accrued = self.presence.get_score(&old_set, user_id).await?;
            self.presence.remove_member(&old_set, user_id).await?;
            self.presence
                .incr_score(&self.keys.accrual_set(range), user_id, accrued)
                .await?;
            info!(
                user_id = %user_id,
                previous,
                range,
                moved_seconds = accrued,
                "Alert range changed, accrual moved"
            );
        }

        self.presence
            .set_string(&self.keys.alert_range(user_id), &range.to_string(), None)
            .await?;
        self.register_bucket(range).await
    }

    /// 当前在用的全部分桶（总是包含默认分桶）
    pub async fn known_buckets(&self) -> Result<Vec<i64>> {
        let members = self
            .presence
            .range_by_score(&self.keys.bucket_index(), 1, None)
            .await?;

        let mut buckets: BTreeSet<i64> = members
            .iter()
            .filter_map(|member| member.parse::<i64>().ok())
            .filter(|bucket| *bucket > 0)
            .collect();
        buckets.insert(self.default_range);
        Ok(buckets.into_iter().collect())
    }

    async fn register_bucket(&self, bucket: i64) -> Result<()> {
        self.presence
            .set_score(&self.keys.bucket_index(), &bucket.to_string(), bucket)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::ManualClock;
    use crate::infrastructure::persistence::memory::{
        InMemoryPresenceStore, InMemoryUserProfileRepository,
    };

    fn service(profiles: Arc<InMemoryUserProfileRepository>) -> (AlertRangeService, Arc<InMemoryPresenceStore>) {
        let clock = Arc::new(ManualClock::default());
        let presence = Arc::new(InMemoryPresenceStore::new(clock));
        let service = AlertRangeService::new(
            presence.clone(),
            profiles,
            PresenceKeys::default(),
            5,
        );
        (service, presence)
    }

    #[tokio::test]
    async fn test_resolve_defaults_when_profile_missing() {
        let (service, presence) = service(Arc::new(InMemoryUserProfileRepository::new()));
        assert_eq!(service.resolve("u1").await.unwrap(), 5);
        assert_eq!(
            presence.get_string("user_alert_range:u1").await.unwrap().as_deref(),
            Some("5")
        );
    }

    #[tokio::test]
    async fn test_resolve_is_sticky() {
        let profiles = Arc::new(InMemoryUserProfileRepository::new());
        profiles.set_alert_range("u1", 10).await;
        let (service, _) = service(profiles.clone());
        assert_eq!(service.resolve("u1").await.unwrap(), 10);

        // 资料变更不影响已缓存的值
        profiles.set_alert_range("u1", 20).await;
        assert_eq!(service.resolve("u1").await.unwrap(), 10);
        assert_eq!(service.known_buckets().await.unwrap(), vec![5, 10]);
    }

    #[tokio::test]
    async fn test_change_range_moves_accrual() {
        let (service, presence) = service(Arc::new(InMemoryUserProfileRepository::new()));
        service.resolve("u1").await.unwrap();
        presence.set_score("online_users:5", "u1", 420).await.unwrap();

        service.change_range("u1", 15).await.unwrap();

        assert_eq!(presence.get_score("online_users:5", "u1").await.unwrap(), 0);
        assert!(presence.range_by_score("online_users:5", 0, None).await.unwrap().is_empty());
        assert_eq!(presence.get_score("online_users:15", "u1").await.unwrap(), 420);
        assert_eq!(service.resolve("u1").await.unwrap(), 15);
        assert_eq!(service.known_buckets().await.unwrap(), vec![5, 15]);
        assert!(service.change_range("u1", 0).await.is_err());
    }
}
