use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::domain::repository::{Clock, PresenceStore};

#[derive(Debug, Clone)]
struct StringEntry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct State {
    strings: HashMap<String, StringEntry>,
    sorted_sets: HashMap<String, HashMap<String, i64>>,
}

/// 内存版在线状态存储，过期时间按注入的时钟计算
pub struct InMemoryPresenceStore {
    clock: Arc<dyn Clock>,
    inner: Arc<RwLock<State>>,
}

impl InMemoryPresenceStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Arc::new(RwLock::new(State::default())),
        }
    }
}

#[async_trait]
impl PresenceStore for InMemoryPresenceStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let now = self.clock.now();
        let guard = self.inner.read().await;
        Ok(guard
            .strings
            .get(key)
            .filter(|entry| entry.expires_at.is_none_or(|at| at >= now))
            .map(|entry| entry.value.clone()))
    }

    async fn set_string(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        let expires_at =
            ttl_seconds.map(|ttl| self.clock.now() + Duration::seconds(ttl as i64));
        let mut guard = self.inner.write().await;
        guard.strings.insert(
            key.to_string(),
            StringEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get_score(&self, set: &str, member: &str) -> Result<i64> {
        let guard = self.inner.read().await;
        Ok(guard
            .sorted_sets
            .get(set)
            .and_then(|members| members.get(member))
            .copied()
            .unwrap_or(0))
    }

    async fn set_score(&self, set: &str, member: &str, value: i64) -> Result<()> {
        let mut guard = self.inner.write().await;
        guard
            .sorted_sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string(), value);
        Ok(())
    }

    async fn incr_score(&self, set: &str, member: &str, delta: i64) -> Result<i64> {
        let mut guard = self.inner.write().await;
        let score = guard
            .sorted_sets
            .entry(set.to_string())
            .or_default()
            .entry(member.to_string())
            .or_insert(0);
        *score += delta;
        Ok(*score)
    }

    async fn range_by_score(&self, set: &str, low: i64, high: Option<i64>) -> Result<Vec<String>> {
        let guard = self.inner.read().await;
        let Some(members) = guard.sorted_sets.get(set) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<(i64, &String)> = members
            .iter()
            .filter(|(_, score)| **score >= low && high.is_none_or(|h| **score < h))
            .map(|(member, score)| (*score, member))
            .collect();
        matched.sort();
        Ok(matched.into_iter().map(|(_, member)| member.clone()).collect())
    }

    async fn remove_member(&self, set: &str, member: &str) -> Result<()> {
        let mut guard = self.inner.write().await;
        if let Some(members) = guard.sorted_sets.get_mut(set) {
            members.remove(member);
        }
        Ok(())
    }
}
