//! 应用启动器 - 负责依赖注入和服务启动

use std::future::Future;

use anyhow::Result;
use flare_social_core::config::FlareAppConfig;
use tokio::sync::watch;
use tracing::{error, info};

use crate::service::wire::{self, ApplicationContext};

/// 应用启动器
pub struct ApplicationBootstrap;

impl ApplicationBootstrap {
    /// 运行应用的主入口点，Ctrl+C 触发停机
    pub async fn run(config: &'static FlareAppConfig) -> Result<()> {
        let context = wire::initialize(config).await?;
        Self::start(context, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(error = %err, "Failed to listen for shutdown signal");
            }
        })
        .await
    }

    /// 启动消费者与调度器，`shutdown` 完成后依次停止
    pub async fn start<F>(context: ApplicationContext, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        info!(
            service = %context.config.service_name,
            jobs = ?context.scheduler.job_names(),
            "Starting presence service"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let job_handles = context.scheduler.clone().start(shutdown_rx.clone());
        let consumer = tokio::spawn(context.consumer.clone().run(shutdown_rx));

        shutdown.await;
        info!("Shutdown signal received, stopping presence service");
        let _ = shutdown_tx.send(true);

        for handle in job_handles {
            if let Err(err) = handle.await {
                error!(error = %err, "Scheduled job loop panicked");
            }
        }
        let result = match consumer.await {
            Ok(result) => result,
            Err(err) => Err(anyhow::anyhow!("activity consumer task failed: {err}")),
        };

        info!("Presence service stopped");
        result
    }
}
