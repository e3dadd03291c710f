use anyhow::Context;

use reportflow_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    reportflow_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = reportflow_api::app::services::build_services(&config).await?;
    let app = reportflow_api::app::router(services.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    services.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown requested");
}
