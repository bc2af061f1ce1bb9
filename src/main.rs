use anyhow::Context;
use tracing_subscriber::EnvFilter;

use teamspace_api::app::{app, AppState};
use teamspace_api::config::config;
use teamspace_api::database::DatabaseManager;
use teamspace_api::storage::FileStorage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECURITY_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")))
        .init();

    let config = config();
    tracing::info!("Starting Teamspace API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("SECURITY_JWT_SECRET must be set outside development");
    }

    let store = DatabaseManager::connect(&config.database)
        .await
        .context("failed to initialise the store")?;
    let files = FileStorage::new(&config.storage).context("failed to prepare file storage")?;
    let state = AppState::new(store, files, config.clone());

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Teamspace API listening on http://{}", bind_addr);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
