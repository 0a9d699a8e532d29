//! 内存实现，用于本地运行与测试

mod activity_queue;
mod notifier;
mod presence_store;
mod statistic_repository;

pub use activity_queue::InMemoryActivityQueue;
pub use notifier::RecordingNotifier;
pub use presence_store::InMemoryPresenceStore;
pub use statistic_repository::{InMemoryDailyStatisticRepository, InMemoryUserProfileRepository};
