use std::env;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use chrono_tz::Tz;
use flare_social_core::config::FlareAppConfig;
use flare_social_core::utils::parse_timezone;

use crate::domain::service::AlertScanPolicy;

#[derive(Clone, Debug)]
pub struct PresenceConfig {
    pub service_name: String,
    pub redis_url: Option<String>,
    pub redis_namespace: Option<String>,
    pub mongo_url: Option<String>,
    pub mongo_database: String,
    pub daily_statistic_collection: String,
    pub user_collection: String,
    pub queue_key: String,
    pub consumer_id: String,
    pub worker_concurrency: usize,
    /// 在线标记过期时间（秒）
    pub marker_ttl_seconds: u64,
    /// 会话断开判定间隔（秒）
    pub session_gap_seconds: i64,
    /// 默认提醒区间（分钟）
    pub default_alert_range: i64,
    pub alert_threshold_seconds: i64,
    pub alert_scan_interval_seconds: u64,
    pub alert_levels: u32,
    pub sleep_start_hour: u32,
    pub sleep_end_hour: u32,
    pub sleep_scan_interval_seconds: u64,
    pub timezone: Tz,
    pub notification_channel: String,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            service_name: "flare-presence".to_string(),
            redis_url: None,
            redis_namespace: None,
            mongo_url: None,
            mongo_database: "flare_social".to_string(),
            daily_statistic_collection: "daily_statistics".to_string(),
            user_collection: "users".to_string(),
            queue_key: "presence:activity_events".to_string(),
            consumer_id: "flare-presence-0".to_string(),
            worker_concurrency: 64,
            marker_ttl_seconds: 60,
            session_gap_seconds: 60,
            default_alert_range: 5,
            alert_threshold_seconds: 300,
            alert_scan_interval_seconds: 300,
            alert_levels: 3,
            sleep_start_hour: 23,
            sleep_end_hour: 6,
            sleep_scan_interval_seconds: 3600,
            timezone: chrono_tz::UTC,
            notification_channel: "presence:notifications".to_string(),
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|v| v.trim().parse::<T>().ok())
}

impl PresenceConfig {
    /// 从应用配置加载（环境变量优先）
    pub fn from_app_config(app: &FlareAppConfig) -> Result<Self> {
        Self::from_sources(app, |name| env::var(name).ok())
    }

    /// 按 环境变量 → 服务配置 → 默认值 的顺序解析
    pub fn from_sources(
        app: &FlareAppConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let service_config = app.presence_service();
        let defaults = Self::default();

        let redis_profile = service_config
            .redis
            .as_deref()
            .and_then(|name| app.redis_profile(name));
        let redis_url = lookup("PRESENCE_REDIS_URL")
            .or_else(|| redis_profile.map(|profile| profile.url.clone()));
        let redis_namespace = lookup("PRESENCE_REDIS_NAMESPACE")
            .or_else(|| redis_profile.and_then(|profile| profile.namespace.clone()));

        let mongo_profile = service_config
            .mongodb
            .as_deref()
            .and_then(|name| app.mongodb_profile(name));
        let mongo_url = lookup("PRESENCE_MONGO_URL")
            .or_else(|| mongo_profile.map(|profile| profile.url.clone()));
        let mongo_database = lookup("PRESENCE_MONGO_DATABASE")
            .or_else(|| mongo_profile.and_then(|profile| profile.database.clone()))
            .unwrap_or(defaults.mongo_database);

        let timezone_name = lookup("PRESENCE_TIMEZONE").or(service_config.timezone.clone());
        let timezone = match timezone_name {
            Some(name) => parse_timezone(&name)
                .ok_or_else(|| anyhow!("unknown timezone '{name}' in presence config"))?,
            None => defaults.timezone,
        };

        let config = Self {
            service_name: lookup("PRESENCE_SERVICE_NAME")
                .or(service_config.service_name)
                .unwrap_or(defaults.service_name),
            redis_url,
            redis_namespace,
            mongo_url,
            mongo_database,
            daily_statistic_collection: lookup("PRESENCE_DAILY_STATISTIC_COLLECTION")
                .or(service_config.daily_statistic_collection)
                .unwrap_or(defaults.daily_statistic_collection),
            user_collection: lookup("PRESENCE_USER_COLLECTION")
                .or(service_config.user_collection)
                .unwrap_or(defaults.user_collection),
            queue_key: lookup("PRESENCE_QUEUE_KEY")
                .or(service_config.queue_key)
                .unwrap_or(defaults.queue_key),
            consumer_id: lookup("PRESENCE_CONSUMER_ID").unwrap_or(defaults.consumer_id),
            worker_concurrency: parse_var(&lookup, "PRESENCE_WORKER_CONCURRENCY")
                .or(service_config.worker_concurrency)
                .unwrap_or(defaults.worker_concurrency),
            marker_ttl_seconds: parse_var(&lookup, "PRESENCE_MARKER_TTL_SECONDS")
                .or(service_config.marker_ttl_seconds)
                .unwrap_or(defaults.marker_ttl_seconds),
            session_gap_seconds: parse_var(&lookup, "PRESENCE_SESSION_GAP_SECONDS")
                .or(service_config.session_gap_seconds)
                .unwrap_or(defaults.session_gap_seconds),
            default_alert_range: parse_var(&lookup, "PRESENCE_DEFAULT_ALERT_RANGE")
                .or(service_config.default_alert_range)
                .unwrap_or(defaults.default_alert_range),
            alert_threshold_seconds: parse_var(&lookup, "PRESENCE_ALERT_THRESHOLD_SECONDS")
                .or(service_config.alert_threshold_seconds)
                .unwrap_or(defaults.alert_threshold_seconds),
            alert_scan_interval_seconds: parse_var(&lookup, "PRESENCE_ALERT_SCAN_INTERVAL_SECONDS")
                .or(service_config.alert_scan_interval_seconds)
                .unwrap_or(defaults.alert_scan_interval_seconds),
            alert_levels: parse_var(&lookup, "PRESENCE_ALERT_LEVELS")
                .or(service_config.alert_levels)
                .unwrap_or(defaults.alert_levels),
            sleep_start_hour: parse_var(&lookup, "PRESENCE_SLEEP_START_HOUR")
                .or(service_config.sleep_start_hour)
                .unwrap_or(defaults.sleep_start_hour),
            sleep_end_hour: parse_var(&lookup, "PRESENCE_SLEEP_END_HOUR")
                .or(service_config.sleep_end_hour)
                .unwrap_or(defaults.sleep_end_hour),
            sleep_scan_interval_seconds: parse_var(&lookup, "PRESENCE_SLEEP_SCAN_INTERVAL_SECONDS")
                .or(service_config.sleep_scan_interval_seconds)
                .unwrap_or(defaults.sleep_scan_interval_seconds),
            timezone,
            notification_channel: lookup("PRESENCE_NOTIFICATION_CHANNEL")
                .or(service_config.notification_channel)
                .unwrap_or(defaults.notification_channel),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_concurrency == 0 {
            return Err(anyhow!("worker_concurrency must be greater than 0"));
        }
        if self.marker_ttl_seconds == 0 || self.session_gap_seconds <= 0 {
            return Err(anyhow!("marker ttl and session gap must be positive"));
        }
        if self.default_alert_range <= 0 {
            return Err(anyhow!("default_alert_range must be positive"));
        }
        if self.alert_levels == 0 {
            return Err(anyhow!("alert_levels must be greater than 0"));
        }
        if self.sleep_start_hour > 23 || self.sleep_end_hour > 23 {
            return Err(anyhow!("sleep window hours must be within 0..=23"));
        }
        if self.alert_scan_interval_seconds == 0 || self.sleep_scan_interval_seconds == 0 {
            return Err(anyhow!("scan intervals must be greater than 0"));
        }
        Ok(())
    }

    pub fn alert_scan_policy(&self) -> AlertScanPolicy {
        AlertScanPolicy::from_threshold_seconds(self.alert_threshold_seconds, self.alert_levels)
    }

    /// 分档基准（分钟）
    pub fn alert_minutes(&self) -> i64 {
        self.alert_scan_policy().alert_minutes
    }
}
