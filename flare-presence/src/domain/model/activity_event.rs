use std::fmt;

use serde::{Deserialize, Serialize};

/// 活跃事件类型
///
/// - `Heartbeat`：轻量轮询接口产生，只用于观察会话是否已过期
/// - `Activity`：其它所有已认证请求产生，刷新在线标记并累计时长
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Heartbeat,
    Activity,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Heartbeat => "heartbeat",
            ActivityKind::Activity => "activity",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 队列中的活跃事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub user_id: String,
    pub kind: ActivityKind,
}

impl ActivityEvent {
    pub fn heartbeat(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            kind: ActivityKind::Heartbeat,
        }
    }

    pub fn activity(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            kind: ActivityKind::Activity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event: ActivityEvent =
            serde_json::from_str(r#"{"userId":"u1","kind":"heartbeat"}"#).unwrap();
        assert_eq!(event, ActivityEvent::heartbeat("u1"));

        let json = serde_json::to_string(&ActivityEvent::activity("u2")).unwrap();
        assert_eq!(json, r#"{"userId":"u2","kind":"activity"}"#);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result = serde_json::from_str::<ActivityEvent>(r#"{"userId":"u1","kind":"logout"}"#);
        assert!(result.is_err());
    }
}
