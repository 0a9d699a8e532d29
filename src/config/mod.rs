//! Flare Social Core 配置模块
//!
//! 该模块提供了应用程序配置管理功能，包括：
//! - 配置文件（单文件或目录）加载和解析
//! - 环境特定配置覆盖
//! - Redis / MongoDB 等基础设施配置
//! - 在线时长统计服务配置定义

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use toml::Value;
use tracing::warn;

mod manager;
pub use manager::ConfigManager;

/// 全局应用配置实例，使用 OnceLock 确保只初始化一次
static APP_CONFIG: OnceLock<FlareAppConfig> = OnceLock::new();

/// 服务基础信息
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// 服务名称
    pub name: String,
    /// 服务版本
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "flare-social".to_string(),
            version: default_version(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（RUST_LOG 优先）
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub with_target: bool,
    #[serde(default)]
    pub with_thread_ids: bool,
    #[serde(default = "default_true")]
    pub with_file: bool,
    #[serde(default = "default_true")]
    pub with_line_number: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: false,
            with_thread_ids: false,
            with_file: true,
            with_line_number: true,
        }
    }
}

/// Redis 连接配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RedisPoolConfig {
    /// Redis 服务器地址
    pub url: String,
    /// 命名空间前缀
    #[serde(default)]
    pub namespace: Option<String>,
    /// 数据库编号
    #[serde(default)]
    pub database: Option<u32>,
}

/// MongoDB 实例配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MongoInstanceConfig {
    /// MongoDB 连接 URL
    pub url: String,
    /// 数据库名称
    #[serde(default)]
    pub database: Option<String>,
}

/// 在线时长统计服务配置
///
/// 所有字段均为可选，缺省值在服务侧解析（环境变量 → 配置文件 → 默认值）
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PresenceServiceConfig {
    /// 服务名称
    #[serde(default)]
    pub service_name: Option<String>,
    /// Redis 配置引用
    #[serde(default)]
    pub redis: Option<String>,
    /// MongoDB 配置引用
    #[serde(default)]
    pub mongodb: Option<String>,
    /// 每日统计集合
    #[serde(default)]
    pub daily_statistic_collection: Option<String>,
    /// 用户资料集合
    #[serde(default)]
    pub user_collection: Option<String>,
    /// 活跃事件队列键
    #[serde(default)]
    pub queue_key: Option<String>,
    /// 并发处理任务数
    #[serde(default)]
    pub worker_concurrency: Option<usize>,
    /// 在线标记过期时间（秒）
    #[serde(default)]
    pub marker_ttl_seconds: Option<u64>,
    /// 会话断开判定间隔（秒）
    #[serde(default)]
    pub session_gap_seconds: Option<i64>,
    /// 默认提醒区间（分钟）
    #[serde(default)]
    pub default_alert_range: Option<i64>,
    /// 提醒阈值（秒），换算为分钟后作为分档基准
    #[serde(default)]
    pub alert_threshold_seconds: Option<i64>,
    /// 提醒扫描间隔（秒）
    #[serde(default)]
    pub alert_scan_interval_seconds: Option<u64>,
    /// 提醒档位数
    #[serde(default)]
    pub alert_levels: Option<u32>,
    /// 睡眠提醒开始小时
    #[serde(default)]
    pub sleep_start_hour: Option<u32>,
    /// 睡眠提醒结束小时
    #[serde(default)]
    pub sleep_end_hour: Option<u32>,
    /// 睡眠提醒扫描间隔（秒）
    #[serde(default)]
    pub sleep_scan_interval_seconds: Option<u64>,
    /// 时区（IANA 名称）
    #[serde(default)]
    pub timezone: Option<String>,
    /// 通知发布频道
    #[serde(default)]
    pub notification_channel: Option<String>,
}

/// 服务配置集合
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServicesConfig {
    /// 在线时长统计服务配置
    #[serde(default)]
    pub presence: Option<PresenceServiceConfig>,
}

/// Flare 应用配置主结构体
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FlareAppConfig {
    /// 服务基础信息
    #[serde(default)]
    pub service: ServiceConfig,
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Redis 配置映射
    #[serde(default)]
    pub redis: HashMap<String, RedisPoolConfig>,
    /// MongoDB 配置映射
    #[serde(default)]
    pub mongodb: HashMap<String, MongoInstanceConfig>,
    /// 服务配置
    #[serde(default)]
    pub services: ServicesConfig,
}

impl FlareAppConfig {
    /// 获取 Redis 配置
    pub fn redis_profile(&self, name: &str) -> Option<&RedisPoolConfig> {
        self.redis.get(name)
    }

    /// 获取 MongoDB 配置
    pub fn mongodb_profile(&self, name: &str) -> Option<&MongoInstanceConfig> {
        self.mongodb.get(name)
    }

    /// 获取在线时长统计服务配置
    pub fn presence_service(&self) -> PresenceServiceConfig {
        self.services.presence.clone().unwrap_or_default()
    }

    /// 校验服务配置中引用的基础设施配置是否存在
    pub fn validate_references(&self) -> Result<()> {
        let presence = self.presence_service();
        if let Some(name) = presence.redis.as_deref() {
            if self.redis_profile(name).is_none() {
                return Err(anyhow!("services.presence references unknown redis profile '{name}'"));
            }
        }
        if let Some(name) = presence.mongodb.as_deref() {
            if self.mongodb_profile(name).is_none() {
                return Err(anyhow!(
                    "services.presence references unknown mongodb profile '{name}'"
                ));
            }
        }
        Ok(())
    }
}

/// 加载配置
pub fn load_config(path: Option<&str>) -> &'static FlareAppConfig {
    let candidates: Vec<PathBuf> = match path {
        Some(p) => vec![PathBuf::from(p)],
        None => vec![PathBuf::from("config"), PathBuf::from("config.toml")],
    };

    APP_CONFIG.get_or_init(|| load_with_fallback(&candidates))
}

/// 加载配置并校验引用
pub fn load_config_with_validation(path: Option<&str>) -> Result<&'static FlareAppConfig> {
    let config = load_config(path);
    config
        .validate_references()
        .with_context(|| "configuration validation failed")?;
    Ok(config)
}

/// 获取应用配置
pub fn app_config() -> Option<&'static FlareAppConfig> {
    APP_CONFIG.get()
}

/// 使用备选方案加载配置
fn load_with_fallback(candidates: &[PathBuf]) -> FlareAppConfig {
    for path in candidates {
        match load_value_from_source(path).and_then(finish_config) {
            Ok(cfg) => return cfg,
            Err(err) => {
                warn!("failed to load config from {}: {err}", path.display());
            }
        }
    }

    warn!("no configuration source succeeded, falling back to defaults");
    FlareAppConfig::default()
}

/// 叠加环境配置并反序列化
fn finish_config(mut value: Value) -> Result<FlareAppConfig> {
    if let Err(e) = ConfigManager::load_environment_config(&mut value) {
        warn!("failed to load environment config: {}", e);
    }
    parse_config(value)
}

/// 将合并后的 TOML 值解析为应用配置
pub fn parse_config(value: Value) -> Result<FlareAppConfig> {
    value
        .try_into()
        .with_context(|| "invalid configuration structure")
}

/// 从源加载配置
fn load_value_from_source(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(anyhow!(
            "configuration path {} does not exist",
            path.display()
        ));
    }

    let metadata = path
        .metadata()
        .with_context(|| format!("unable to read metadata for {}", path.display()))?;

    if metadata.is_dir() {
        load_value_from_directory(path)
    } else {
        load_toml_value(path)
    }
}

/// 从目录加载配置
fn load_value_from_directory(path: &Path) -> Result<Value> {
    let base_file = path.join("base.toml");
    if !base_file.exists() {
        return Err(anyhow!(
            "missing base configuration: {}",
            base_file.display()
        ));
    }

    let mut merged = load_toml_value(&base_file)?;

    if !merged.is_table() {
        return Err(anyhow!(
            "base configuration must be a table: {}",
            base_file.display()
        ));
    }

    merge_directory(&mut merged, &path.join("shared"))?;
    merge_directory(&mut merged, &path.join("services"))?;
    merge_directory(&mut merged, &path.join("overrides"))?;

    Ok(merged)
}

/// 按文件名顺序合并目录下的 `*.toml` 片段，目录不存在时跳过
fn merge_directory(root: &mut Value, dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    let mut fragments: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("unable to read config directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| is_toml_fragment(path))
        .collect();
    fragments.sort();

    for fragment in &fragments {
        merge_value(root, load_toml_value(fragment)?);
    }
    Ok(())
}

fn is_toml_fragment(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

fn load_toml_value(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config fragment {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("invalid TOML content in fragment {}", path.display()))
}

/// 表按键递归合并，其余类型整体覆盖
pub(crate) fn merge_value(base: &mut Value, overlay: Value) {
    let Value::Table(overlay_table) = overlay else {
        *base = overlay;
        return;
    };
    let Value::Table(base_table) = base else {
        *base = Value::Table(overlay_table);
        return;
    };
    for (key, value) in overlay_table {
        match base_table.get_mut(&key) {
            Some(existing) => merge_value(existing, value),
            None => {
                base_table.insert(key, value);
            }
        }
    }
}
