//! Flare Social Core 公共库
//!
//! 提供统一的配置加载、错误类型、日志初始化与指标注册

pub mod config;
pub mod error;
pub mod metrics;
pub mod tracing;
pub mod utils;

pub use config::{
    ConfigManager, FlareAppConfig, LoggingConfig, MongoInstanceConfig, PresenceServiceConfig,
    RedisPoolConfig, ServiceConfig, app_config, load_config, load_config_with_validation,
};
pub use error::*;
pub use utils::*;
