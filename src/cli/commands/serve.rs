use crate::cli::open_store;
use crate::config::AppConfig;
use crate::{app, AppState};

pub async fn handle(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting Recipe API in {:?} mode", config.environment);

    let store = open_store(&config).await?;
    tokio::fs::create_dir_all(&config.media.root).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!("Recipe API listening on http://{}", bind_addr);

    axum::serve(listener, app(AppState::new(config, store))).await?;
    Ok(())
}
