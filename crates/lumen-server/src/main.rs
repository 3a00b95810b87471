mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use lumen_api::auth::{AppStateInner, hash_password};
use lumen_db::{PersistenceManager, Repositories, StorageConfig};

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "lumen=debug,lumen_db=debug,lumen_api=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = ServerConfig::from_env()?;

    // Load or create the store before taking traffic
    let persistence = Arc::new(PersistenceManager::new(StorageConfig::from_env()));
    persistence.acquire()?;
    if let Some(path) = persistence.backing_path() {
        info!("Data file: {}", path.display());
    }

    let repos = Repositories::new(Arc::clone(&persistence))
        .with_default_currency(&config.default_currency);

    if let Some((username, password)) = &config.admin {
        let hash = hash_password(password)?;
        repos.admins.ensure_admin(username, &hash)?;
    }

    let app = lumen_api::router(AppStateInner::new(repos, config.jwt_secret.clone()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!(
        "Lumen server listening on {}{}",
        config.addr,
        if config.production { " (production)" } else { "" }
    );

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Final flush and drop of the in-memory engine
    if let Err(e) = persistence.release() {
        error!("Final snapshot failed: {}", e);
        return Err(e.into());
    }
    info!("Lumen server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
