use anyhow::Result;
use async_trait::async_trait;
use flare_social_core::error::{ErrorCode, InfraResultExt};
use redis::{AsyncCommands, aio::ConnectionManager};

use crate::domain::repository::PresenceStore;

/// 基于 Redis 的在线状态存储
///
/// 字符串键使用 `SET EX`，有序集合分值以整数秒存储。
/// ConnectionManager 内部复用同一条多路复用连接，克隆成本很低。
#[derive(Clone)]
pub struct RedisPresenceStore {
    conn: ConnectionManager,
}

impl RedisPresenceStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(client: &redis::Client) -> Result<Self> {
        let conn = ConnectionManager::new(client.clone())
            .await
            .into_flare(ErrorCode::ServiceUnavailable, "failed to open redis connection")?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl PresenceStore for RedisPresenceStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(key)
            .await
            .into_flare(ErrorCode::DatabaseError, "failed to read presence key")?;
        Ok(value)
    }

    async fn set_string(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        let mut conn = self.conn.clone();
        match ttl_seconds {
            Some(ttl) => {
                let _: () = conn
                    .set_ex(key, value, ttl)
                    .await
                    .into_flare(ErrorCode::DatabaseError, "failed to write presence key")?;
            }
            None => {
                let _: () = conn
                    .set(key, value)
                    .await
                    .into_flare(ErrorCode::DatabaseError, "failed to write presence key")?;
            }
        }
        Ok(())
    }

    async fn get_score(&self, set: &str, member: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        let score: Option<f64> = conn
            .zscore(set, member)
            .await
            .into_flare(ErrorCode::DatabaseError, "failed to read accrual score")?;
        Ok(score.map(|s| s as i64).unwrap_or(0))
    }

    async fn set_score(&self, set: &str, member: &str, value: i64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .zadd(set, member, value)
            .await
            .into_flare(ErrorCode::DatabaseError, "failed to write accrual score")?;
        Ok(())
    }

    async fn incr_score(&self, set: &str, member: &str, delta: i64) -> Result<i64> {
        let mut conn = self.conn.clone();
        let score: f64 = conn
            .zincr(set, member, delta)
            .await
            .into_flare(ErrorCode::DatabaseError, "failed to increment accrual score")?;
        Ok(score as i64)
    }

    async fn range_by_score(&self, set: &str, low: i64, high: Option<i64>) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        // 右开区间使用 "(" 前缀
        let max = match high {
            Some(high) => format!("({high}"),
            None => "+inf".to_string(),
        };
        let members: Vec<String> = conn
            .zrangebyscore(set, low, max)
            .await
            .into_flare(ErrorCode::DatabaseError, "failed to range accrual set")?;
        Ok(members)
    }

    async fn remove_member(&self, set: &str, member: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .zrem(set, member)
            .await
            .into_flare(ErrorCode::DatabaseError, "failed to remove accrual member")?;
        Ok(())
    }
}
