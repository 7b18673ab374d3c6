//src/main.rs

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use kitchen_stock::{
    config::{AppState, Config},
    routes::build_app,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    // If the configuration is broken the service must not start
    let config = Config::from_env().context("invalid configuration")?;
    let addr = config.bind_addr.clone();

    let app_state = AppState::new(config)
        .await
        .context("failed to initialise the application state")?;

    let app = build_app(app_state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("🚀 Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
