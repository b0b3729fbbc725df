use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use caregate::config::{self, AppConfig};
use caregate::store::{Fixture, MemoryStore, PgPrincipalStore};
use caregate::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    config.validate().context("invalid configuration")?;
    tracing::info!("Starting caregate in {:?} mode", config.environment);

    let state = build_state(config).await?;

    if let Some(secs) = config.governor.sweep_interval_secs {
        state.governor.clone().spawn_sweeper(Duration::from_secs(secs));
        tracing::info!("Attempt window sweeper running every {}s", secs);
    }

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("caregate listening on http://{}", bind_addr);

    axum::serve(listener, app(state).into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("server error")?;

    Ok(())
}

/// Postgres when DATABASE_URL is set, then a YAML fixture, then an empty store
async fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    if config.database.url.is_some() {
        let store = PgPrincipalStore::connect(&config.database).await?;
        return Ok(AppState::new(config, Arc::new(store))?);
    }

    let store = match &config.fixture_path {
        Some(path) => {
            let store = Fixture::load(path)?.into_store();
            tracing::info!("Loaded {} principal(s) from fixture {}", store.len(), path);
            store
        }
        None => {
            tracing::warn!("No DATABASE_URL or CAREGATE_FIXTURE set; starting with an empty principal store");
            MemoryStore::new()
        }
    };

    Ok(AppState::new(config, Arc::new(store))?)
}
