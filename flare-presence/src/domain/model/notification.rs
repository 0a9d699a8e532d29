use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 通知模板
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum NotificationTemplate {
    /// 分档在线时长提醒
    OnlineTimeAlert { level: u32 },
    /// 深夜睡眠提醒
    SleepReminder,
}

impl NotificationTemplate {
    pub fn kind(&self) -> String {
        match self {
            NotificationTemplate::OnlineTimeAlert { level } => {
                format!("online_time_alert_level_{level}")
            }
            NotificationTemplate::SleepReminder => "sleep_reminder".to_string(),
        }
    }
}

/// 发往通知服务的消息，本服务只负责目标用户与参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub user_id: String,
    #[serde(flatten)]
    pub template: NotificationTemplate,
    pub kind: String,
    pub params: BTreeMap<String, Value>,
}

impl Notification {
    pub fn new(user_id: impl Into<String>, template: NotificationTemplate) -> Self {
        Self {
            user_id: user_id.into(),
            kind: template.kind(),
            template,
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_payload() {
        let notification = Notification::new("u1", NotificationTemplate::OnlineTimeAlert { level: 2 })
            .with_param("alertMinutes", 5);
        assert_eq!(notification.kind, "online_time_alert_level_2");

        let json: Value = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["template"], "online_time_alert");
        assert_eq!(json["level"], 2);
        assert_eq!(json["params"]["alertMinutes"], 5);
    }
}
