use std::sync::Arc;

use anyhow::Context;

use achievements_api::auth::FirebaseIdentity;
use achievements_api::config;
use achievements_api::database::{ConnectionCache, MongoItemStore};
use achievements_api::routes;
use achievements_api::services::ItemService;
use achievements_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up MONGODB_URI, FIREBASE_*, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Missing required configuration is fatal at startup
    let config = config::init().context("configuration")?;

    let connections = Arc::new(ConnectionCache::new(config.database.clone()));
    let store = Arc::new(MongoItemStore::new(connections.clone()));
    let identity = Arc::new(FirebaseIdentity::new(config.firebase.clone()));

    let state = AppState {
        items: Arc::new(ItemService::new(store)),
        identity,
    };

    let app = routes::app(state);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Achievements API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server")?;

    // Teardown is shutdown-only; requests never close the cache
    connections.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}
