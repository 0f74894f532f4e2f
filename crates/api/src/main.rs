use std::sync::Arc;

use anyhow::Context;

use shopdesk_api::app::{build_app, AppServices};
use shopdesk_api::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shopdesk_observability::init();

    let config = ApiConfig::from_env()?;
    let services = Arc::new(
        AppServices::from_config(&config)
            .await
            .context("failed to initialise the store")?,
    );
    let broadcaster = services.start_dashboard(config.dashboard_interval)?;

    let app = build_app(Arc::clone(&services));
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    broadcaster.shutdown().await;
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
