//! casedash - case-management dashboard API server

use anyhow::{Context, Result};
use casedash_backend::{
    auth::JwtHandler,
    build_router,
    store::{CaseStore, MySqlStore},
    AppState, Config,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load();
    init_tracing();

    info!("Case dashboard API starting");

    let jwt_secret = config.jwt_secret()?;

    let store = Arc::new(MySqlStore::connect(&config));
    match store.ping().await {
        Ok(_) => info!(database = %config.db_name, "Database reachable"),
        Err(e) => warn!("Database not reachable at startup: {e}"),
    }

    let jwt_handler = Arc::new(JwtHandler::new(&jwt_secret));
    let state = AppState::new(store, jwt_handler);

    let static_dir = config.static_dir.is_dir().then_some(config.static_dir.as_path());
    if static_dir.is_none() {
        warn!(
            dir = %config.static_dir.display(),
            "Static directory missing; serving API only"
        );
    }

    let app = build_router(state, static_dir);

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "casedash_backend=debug,casedash=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
