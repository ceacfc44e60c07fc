use anyhow::Context;

use wms_api::app::{build_app, build_services};
use wms_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    wms_observability::init();

    let config = ApiConfig::from_env()?;
    let services = build_services(&config).await?;
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
