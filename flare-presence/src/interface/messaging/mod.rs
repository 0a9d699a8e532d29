mod activity_consumer;

pub use activity_consumer::{ActivityEventConsumer, ProcessStatus};
