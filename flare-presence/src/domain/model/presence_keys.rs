/// 在线状态相关的 Redis 键
///
/// 所有键共用同一个可选命名空间前缀，写入方与读取方必须使用同一个实例生成键。
#[derive(Debug, Clone, Default)]
pub struct PresenceKeys {
    namespace: Option<String>,
}

impl PresenceKeys {
    pub fn new(namespace: Option<String>) -> Self {
        Self {
            namespace: namespace.filter(|ns| !ns.is_empty()),
        }
    }

    fn key(&self, raw: String) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}:{raw}"),
            None => raw,
        }
    }

    /// 在线标记 `last_online:{userId}`
    pub fn session_marker(&self, user_id: &str) -> String {
        self.key(format!("last_online:{user_id}"))
    }

    /// 会话累计有序集合 `online_users:{bucket}`
    pub fn accrual_set(&self, bucket: i64) -> String {
        self.key(format!("online_users:{bucket}"))
    }

    /// 已使用的提醒区间索引
    pub fn bucket_index(&self) -> String {
        self.key("online_users:buckets".to_string())
    }

    /// 用户提醒区间缓存 `user_alert_range:{userId}`
    pub fn alert_range(&self, user_id: &str) -> String {
        self.key(format!("user_alert_range:{user_id}"))
    }

    /// 定时任务开关
    pub fn job_switch(&self, job: &str) -> String {
        self.key(format!("job_active:{job}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_without_namespace() {
        let keys = PresenceKeys::default();
        assert_eq!(keys.session_marker("u1"), "last_online:u1");
        assert_eq!(keys.accrual_set(5), "online_users:5");
        assert_eq!(keys.alert_range("u1"), "user_alert_range:u1");
    }

    #[test]
    fn test_keys_with_namespace() {
        let keys = PresenceKeys::new(Some("social".to_string()));
        assert_eq!(keys.session_marker("u1"), "social:last_online:u1");
        assert_eq!(keys.bucket_index(), "social:online_users:buckets");
        assert_eq!(keys.job_switch("alert_band_scan"), "social:job_active:alert_band_scan");

        let empty = PresenceKeys::new(Some(String::new()));
        assert_eq!(empty.accrual_set(10), "online_users:10");
    }
}
