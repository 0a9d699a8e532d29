//! 在线时长统计服务
//!
//! 根据活跃事件推断用户的连续在线会话，会话结束时写入每日统计，
//! 并定时扫描进行中的会话发出分档在线提醒与深夜睡眠提醒。

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;
pub mod service;

pub use config::PresenceConfig;
pub use service::{ApplicationBootstrap, ApplicationContext};
