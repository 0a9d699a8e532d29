//! 领域模型

mod activity_event;
mod alert_band;
mod daily_statistic;
mod notification;
mod presence_keys;

pub use activity_event::{ActivityEvent, ActivityKind};
pub use alert_band::AlertBand;
pub use daily_statistic::DailyStatistic;
pub use notification::{Notification, NotificationTemplate};
pub use presence_keys::PresenceKeys;
