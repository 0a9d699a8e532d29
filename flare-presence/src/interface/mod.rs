//! 接口层：队列消费与定时任务

pub mod messaging;
pub mod scheduler;
