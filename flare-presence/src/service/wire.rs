//! Wire 风格的依赖注入模块
//!
//! 按依赖顺序构建存储、领域服务、应用层 handler、消费者与调度器

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as AnyhowContext, Result, anyhow};
use flare_social_core::config::FlareAppConfig;
use flare_social_core::metrics::PresenceMetrics;
use mongodb::Client as MongoClient;
use mongodb::options::ClientOptions;
use redis::Client as RedisClient;
use tracing::info;

use crate::application::handlers::{PresenceCommandHandler, PresenceQueryHandler};
use crate::config::PresenceConfig;
use crate::domain::model::PresenceKeys;
use crate::domain::repository::{
    ActivityQueue, Clock, DailyStatisticRepository, Notifier, PresenceStore,
    UserProfileRepository,
};
use crate::domain::service::{
    AccrualPolicy, AlertBandScanner, AlertRangeService, JobSwitch, SessionAccrualService,
    SleepReminderScanner,
};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::persistence::memory::{
    InMemoryActivityQueue, InMemoryDailyStatisticRepository, InMemoryPresenceStore,
    InMemoryUserProfileRepository, RecordingNotifier,
};
use crate::infrastructure::persistence::mongo::{
    MongoDailyStatisticRepository, MongoUserProfileRepository,
};
use crate::infrastructure::persistence::redis::{
    RedisActivityQueue, RedisNotificationPublisher, RedisPresenceStore,
};
use crate::interface::messaging::ActivityEventConsumer;
use crate::interface::scheduler::{JobScheduler, Schedule};

/// 存储与外部协作方
pub struct Backends {
    pub presence: Arc<dyn PresenceStore>,
    pub statistics: Arc<dyn DailyStatisticRepository>,
    pub profiles: Arc<dyn UserProfileRepository>,
    pub notifier: Arc<dyn Notifier>,
    pub queue: Arc<dyn ActivityQueue>,
    pub clock: Arc<dyn Clock>,
}

/// 应用上下文 - 包含所有已初始化的服务
pub struct ApplicationContext {
    pub config: Arc<PresenceConfig>,
    pub keys: PresenceKeys,
    pub presence: Arc<dyn PresenceStore>,
    pub queue: Arc<dyn ActivityQueue>,
    pub metrics: Arc<PresenceMetrics>,
    pub alert_range_service: Arc<AlertRangeService>,
    pub accrual_service: Arc<SessionAccrualService>,
    pub job_switch: Arc<JobSwitch>,
    pub alert_scanner: Arc<AlertBandScanner>,
    pub sleep_scanner: Arc<SleepReminderScanner>,
    pub command_handler: Arc<PresenceCommandHandler>,
    pub query_handler: Arc<PresenceQueryHandler>,
    pub consumer: Arc<ActivityEventConsumer>,
    pub scheduler: Arc<JobScheduler>,
}

/// 使用 Redis + MongoDB 构建应用上下文
pub async fn initialize(app_config: &FlareAppConfig) -> Result<ApplicationContext> {
    // 1. 加载服务配置
    let config = PresenceConfig::from_app_config(app_config)
        .with_context(|| "Failed to load presence service configuration")?;

    // 2. 创建 Redis 客户端（业务命令与阻塞队列各用一条连接）
    let redis_url = config
        .redis_url
        .clone()
        .ok_or_else(|| anyhow!("presence service requires a redis url"))?;
    let redis_client =
        RedisClient::open(redis_url.as_str()).with_context(|| "Failed to create Redis client")?;
    let presence_store = RedisPresenceStore::connect(&redis_client).await?;
    let queue = RedisActivityQueue::connect(&redis_client, config.queue_key.clone(), &config.consumer_id)
        .await?;
    let publisher_conn = redis::aio::ConnectionManager::new(redis_client.clone())
        .await
        .with_context(|| "Failed to open Redis publisher connection")?;
    let notifier = RedisNotificationPublisher::new(publisher_conn, config.notification_channel.clone());

    // 3. 创建 MongoDB 客户端
    let mongo_url = config
        .mongo_url
        .clone()
        .ok_or_else(|| anyhow!("presence service requires a mongodb url"))?;
    let options = ClientOptions::parse(&mongo_url)
        .await
        .with_context(|| "Failed to parse MongoDB url")?;
    let mongo_client =
        Arc::new(MongoClient::with_options(options).with_context(|| "Failed to create MongoDB client")?);
    let statistics = MongoDailyStatisticRepository::new(
        mongo_client.clone(),
        &config.mongo_database,
        &config.daily_statistic_collection,
    )
    .await?;
    let profiles =
        MongoUserProfileRepository::new(mongo_client, &config.mongo_database, &config.user_collection);

    info!(
        mongo_database = %config.mongo_database,
        queue = %config.queue_key,
        "Presence backends connected"
    );

    Ok(assemble(
        config,
        Backends {
            presence: Arc::new(presence_store),
            statistics: Arc::new(statistics),
            profiles: Arc::new(profiles),
            notifier: Arc::new(notifier),
            queue: Arc::new(queue),
            clock: Arc::new(SystemClock),
        },
    ))
}

/// 使用内存存储构建应用上下文
pub fn initialize_in_memory(config: PresenceConfig, clock: Arc<dyn Clock>) -> ApplicationContext {
    let backends = Backends {
        presence: Arc::new(InMemoryPresenceStore::new(clock.clone())),
        statistics: Arc::new(InMemoryDailyStatisticRepository::new()),
        profiles: Arc::new(InMemoryUserProfileRepository::new()),
        notifier: Arc::new(RecordingNotifier::new()),
        queue: Arc::new(InMemoryActivityQueue::new()),
        clock,
    };
    assemble(config, backends)
}

/// 组装领域服务、handler、消费者与调度器
pub fn assemble(config: PresenceConfig, backends: Backends) -> ApplicationContext {
    let config = Arc::new(config);
    let keys = PresenceKeys::new(config.redis_namespace.clone());
    let metrics = Arc::new(PresenceMetrics::new());

    // 领域服务
    let alert_range_service = Arc::new(AlertRangeService::new(
        backends.presence.clone(),
        backends.profiles.clone(),
        keys.clone(),
        config.default_alert_range,
    ));
    let accrual_service = Arc::new(SessionAccrualService::new(
        backends.presence.clone(),
        backends.statistics.clone(),
        alert_range_service.clone(),
        backends.clock.clone(),
        keys.clone(),
        AccrualPolicy {
            marker_ttl_seconds: config.marker_ttl_seconds,
            session_gap_seconds: config.session_gap_seconds,
            timezone: config.timezone,
        },
        metrics.clone(),
    ));
    let alert_scanner = Arc::new(AlertBandScanner::new(
        backends.presence.clone(),
        alert_range_service.clone(),
        backends.notifier.clone(),
        keys.clone(),
        config.alert_scan_policy(),
        metrics.clone(),
    ));
    let sleep_scanner = Arc::new(SleepReminderScanner::new(
        backends.presence.clone(),
        alert_range_service.clone(),
        backends.notifier.clone(),
        keys.clone(),
        metrics.clone(),
    ));
    let job_switch = Arc::new(JobSwitch::new(backends.presence.clone(), keys.clone()));

    // 应用层
    let command_handler = Arc::new(PresenceCommandHandler::new(
        accrual_service.clone(),
        alert_range_service.clone(),
    ));
    let query_handler = Arc::new(PresenceQueryHandler::new(
        backends.statistics.clone(),
        backends.presence.clone(),
        alert_range_service.clone(),
        keys.clone(),
    ));

    // 接口层
    let consumer = Arc::new(ActivityEventConsumer::new(
        backends.queue.clone(),
        command_handler.clone(),
        metrics.clone(),
        config.worker_concurrency,
    ));

    let mut scheduler = JobScheduler::new(job_switch.clone(), backends.clock.clone(), config.timezone);
    scheduler.register(
        alert_scanner.clone(),
        Schedule::Interval {
            every: Duration::from_secs(config.alert_scan_interval_seconds),
        },
    );
    scheduler.register(
        sleep_scanner.clone(),
        Schedule::Window {
            start_hour: config.sleep_start_hour,
            end_hour: config.sleep_end_hour,
            every: Duration::from_secs(config.sleep_scan_interval_seconds),
        },
    );

    ApplicationContext {
        config,
        keys,
        presence: backends.presence,
        queue: backends.queue,
        metrics,
        alert_range_service,
        accrual_service,
        job_switch,
        alert_scanner,
        sleep_scanner,
        command_handler,
        query_handler,
        consumer,
        scheduler: Arc::new(scheduler),
    }
}
