mod activity_queue;
mod notification_publisher;
mod presence_store;

pub use activity_queue::RedisActivityQueue;
pub use notification_publisher::RedisNotificationPublisher;
pub use presence_store::RedisPresenceStore;
