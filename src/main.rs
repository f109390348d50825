use convopulse::bootstrap;
use convopulse::config::Config;
use convopulse::domain::events::EventName;
use convopulse::domain::ports::SystemClock;
use convopulse::infrastructure::observability;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    observability::init(&config)?;
    tracing::info!("Configuration loaded");

    let app = bootstrap::build_app(
        &config,
        Arc::new(SystemClock),
        bootstrap::default_responders(),
        Vec::new(),
    );
    tracing::info!(
        "{} ready: {} listener(s) on message.created",
        config.service_name,
        app.dispatcher.listener_count(EventName::MessageCreated)
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    Ok(())
}
