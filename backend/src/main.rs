use tracing::info;
use tracing_subscriber::EnvFilter;

use capcompare_backend::api::create_router;
use capcompare_backend::app::AppContext;
use capcompare_backend::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    info!("✅ Configuration loaded");

    let context = AppContext::from_config(&config);

    if let Some(scheduler) = &context.scheduler {
        scheduler.start().await;
        info!("✅ Discovery scheduler started");
    }

    let app = create_router(context.api_state());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("🚀 Server listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;

    if let Some(scheduler) = &context.scheduler {
        scheduler.stop().await;
    }
    Ok(())
}
