use flare_presence::ApplicationBootstrap;
use flare_social_core::load_config_with_validation;
use flare_social_core::tracing::init_tracing_from_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_config = load_config_with_validation(Some("config"))?;
    init_tracing_from_config(Some(&app_config.logging));

    ApplicationBootstrap::run(app_config).await
}
