//! 定时任务持久化开关

use std::sync::Arc;

use anyhow::Result;

use crate::domain::model::PresenceKeys;
use crate::domain::repository::PresenceStore;

/// 读取 `job_active:{name}`；键缺失视为开启，"0" / "false" / "off" 视为关闭
pub struct JobSwitch {
    presence: Arc<dyn PresenceStore>,
    keys: PresenceKeys,
}

impl JobSwitch {
    pub fn new(presence: Arc<dyn PresenceStore>, keys: PresenceKeys) -> Self {
        Self { presence, keys }
    }

    pub async fn is_active(&self, job: &str) -> Result<bool> {
        let value = self.presence.get_string(&self.keys.job_switch(job)).await?;
        Ok(match value.as_deref().map(str::trim) {
            None => true,
            Some(v) => !(v == "0" || v.eq_ignore_ascii_case("false") || v.eq_ignore_ascii_case("off")),
        })
    }

    pub async fn set_active(&self, job: &str, active: bool) -> Result<()> {
        let value = if active { "1" } else { "0" };
        self.presence
            .set_string(&self.keys.job_switch(job), value, None)
            .await
    }
}
