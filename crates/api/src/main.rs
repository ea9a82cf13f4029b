use anyhow::Context;

use gatepass_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gatepass_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = gatepass_api::app::services::build_services(&config).await?;
    let app = gatepass_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        storage = ?config.storage,
        mode = ?config.reconciliation_mode,
        "gate pass server listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
